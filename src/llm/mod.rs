mod ollama;

pub use ollama::OllamaGenerator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::GenerationError;

/// Output of one generation call. Token counts are reported when the backend
/// provides them.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub model: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Opaque text-completion service behind the retrieval pipeline.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        context: &str,
        system_prompt: Option<&str>,
    ) -> Result<Generation, GenerationError>;

    /// Model identifier reported even when generation is skipped.
    fn model_id(&self) -> &str;
}

pub fn create_generator(config: &LlmConfig) -> Arc<dyn Generator> {
    Arc::new(OllamaGenerator::new(&config.endpoint, &config.model))
}
