use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Generation, Generator};
use crate::error::GenerationError;

/// Generation client for an Ollama server's `/api/generate` endpoint,
/// non-streaming.
pub struct OllamaGenerator {
    endpoint: String,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaGenerator {
    pub fn new(endpoint: &str, model: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to build HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        }
    }
}

fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful code assistant. Using the provided code context and \
         reasoning abilities, answer the user's query. Provide relevant code \
         snippets when applicable.\n\n\
         Context:\n{context}\n\n\
         Query:\n{query}\n\n\
         Answer (include code where applicable):\n"
    )
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(
        &self,
        query: &str,
        context: &str,
        system_prompt: Option<&str>,
    ) -> Result<Generation, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(query, context),
            system: system_prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        debug!(model = %self.model, "generation completed");

        Ok(Generation {
            text: parsed.response,
            model: self.model.clone(),
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
