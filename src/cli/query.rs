use anyhow::Result;
use console::{style, Emoji};

use crate::config::Settings;
use crate::embedder::create_embedder;
use crate::llm::create_generator;
use crate::rag::RagPipeline;
use crate::store::create_store;

static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");
static FILE: Emoji<'_, '_> = Emoji("📄 ", "");

/// Answers one question against the indexed code and prints the sources that
/// backed the answer.
pub async fn run_query(
    settings: &Settings,
    question: &str,
    top_k: Option<usize>,
    system_prompt: Option<&str>,
) -> Result<()> {
    let embedder = create_embedder(&settings.embedding);
    let store = create_store(&settings.store);
    let generator = create_generator(&settings.llm);

    let rag = RagPipeline::new(embedder, store, generator, &settings.retrieval);

    println!(
        "\n{}Asking: {}\n",
        SEARCH,
        style(question).yellow().bold()
    );

    let outcome = rag.process_query(question, top_k, system_prompt).await?;

    println!("{}\n", outcome.answer);

    if !outcome.sources.is_empty() {
        println!(
            "Sources ({} chunks, model {}):",
            style(outcome.chunks_retrieved).cyan(),
            style(&outcome.model).dim()
        );
        for (i, source) in outcome.sources.iter().enumerate() {
            println!(
                "{} {}. {} {}",
                FILE,
                style(i + 1).dim(),
                style(&source.file_path).green(),
                style(format!("({})", source.repo_name)).dim()
            );
        }
    }

    if let (Some(prompt), Some(completion)) = (outcome.prompt_tokens, outcome.completion_tokens) {
        println!(
            "\n  Tokens: {} prompt / {} completion",
            style(prompt).dim(),
            style(completion).dim()
        );
    }

    Ok(())
}
