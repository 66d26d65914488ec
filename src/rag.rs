use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::RetrievalConfig;
use crate::embedder::Embedder;
use crate::error::RagError;
use crate::llm::Generator;
use crate::store::{ScoredChunk, VectorStore};

/// Answer returned when retrieval finds nothing; generation is skipped.
pub const NO_RESULTS_ANSWER: &str = "No relevant code found for your query.";

const CONTEXT_DELIMITER: &str = "\n---\n";

/// Everything a caller gets back for one question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub model: String,
    pub chunks_retrieved: usize,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Attribution for one retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub file_path: String,
    pub repo_name: String,
    pub file_type: String,
}

/// Retry schedule for store queries. The vector store is the most likely
/// transient failure point under load, so only the retrieval step retries;
/// embedding and generation fail straight through.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            base_delay: Duration::from_secs(config.retry_base_delay_secs),
            max_delay: Duration::from_secs(config.retry_max_delay_secs),
        }
    }

    /// Exponential from the base, capped: 4s, 8s, 10s, 10s, ... with the
    /// default configuration.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Query path: embed the question, retrieve the closest chunks, hand the
/// assembled context to the generation backend.
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    default_top_k: usize,
    retry: RetryPolicy,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            default_top_k: config.top_k,
            retry: RetryPolicy::from_config(config),
        }
    }

    pub async fn process_query(
        &self,
        query: &str,
        top_k: Option<usize>,
        system_prompt: Option<&str>,
    ) -> Result<QueryOutcome, RagError> {
        let top_k = top_k.unwrap_or(self.default_top_k);

        let query_embedding = self.embedder.embed(query).await?;
        let chunks = self.retrieve(&query_embedding, top_k).await?;

        if chunks.is_empty() {
            info!("no relevant chunks for query");
            return Ok(QueryOutcome {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
                model: self.generator.model_id().to_string(),
                chunks_retrieved: 0,
                prompt_tokens: None,
                completion_tokens: None,
            });
        }

        let context = build_context(&chunks);
        let generation = self
            .generator
            .generate(query, &context, system_prompt)
            .await?;

        let sources = chunks
            .iter()
            .map(|chunk| SourceRef {
                file_path: chunk.metadata.file_path.clone(),
                repo_name: chunk.metadata.repo_name.clone(),
                file_type: chunk.metadata.file_type.clone(),
            })
            .collect();

        Ok(QueryOutcome {
            answer: generation.text,
            sources,
            model: generation.model,
            chunks_retrieved: chunks.len(),
            prompt_tokens: generation.prompt_tokens,
            completion_tokens: generation.completion_tokens,
        })
    }

    async fn retrieve(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let mut attempt = 1;
        loop {
            match self.store.query(embedding, top_k).await {
                Ok(chunks) => return Ok(chunks),
                Err(err) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(attempt, "store query failed, retrying in {delay:?}: {err}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(RagError::Retrieval {
                        attempts: attempt,
                        source: err,
                    })
                }
            }
        }
    }
}

/// Concatenates retrieved chunks with their attribution, in store order. The
/// store's relevance ranking is authoritative; nothing is re-ranked here.
fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "File: {}\nRepository: {}\nContent:\n{}\n",
                chunk.metadata.file_path, chunk.metadata.repo_name, chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
