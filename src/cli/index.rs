use std::sync::Arc;

use anyhow::Result;
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::embedder::create_embedder;
use crate::index::{RepositoryIndexer, SeenSet};
use crate::store::create_store;

static INDEXING: Emoji<'_, '_> = Emoji("📊 ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "");

/// Runs one indexing pass over every configured repository and prints a
/// summary.
pub async fn run_index(settings: &Settings) -> Result<()> {
    let embedder = create_embedder(&settings.embedding);
    embedder.health_check().await?;

    let store = create_store(&settings.store);
    let indexer = RepositoryIndexer::new(
        settings,
        embedder,
        Arc::clone(&store),
        Arc::new(SeenSet::new()),
    );

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("{}Indexing repositories...", INDEXING));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let report = indexer.index_all().await;
    pb.finish_and_clear();

    let report = report?;

    println!("\n{}Indexing complete!\n", SUCCESS);
    println!(
        "  Repositories:    {}",
        style(report.repos_indexed).green()
    );
    println!("  Files indexed:   {}", style(report.files_indexed).cyan());
    println!(
        "  Chunks written:  {}",
        style(report.chunks_written).cyan()
    );
    println!(
        "  Store entries:   {}",
        style(store.count().await?).yellow()
    );

    Ok(())
}
