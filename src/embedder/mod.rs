mod ollama;

pub use ollama::OllamaEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

/// Maps text to fixed-length vectors. Dimensionality is constant for a given
/// model configuration.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
    fn dimensions(&self) -> usize;
    async fn health_check(&self) -> Result<(), EmbeddingError>;
}

pub fn create_embedder(config: &EmbeddingConfig) -> Arc<dyn Embedder> {
    Arc::new(OllamaEmbedder::new(
        &config.endpoint,
        &config.model,
        config.dimensions,
    ))
}
