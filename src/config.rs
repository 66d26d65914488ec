use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Full configuration surface, built once at startup and passed by reference
/// to every component constructor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gerrit: GerritConfig,
    pub github: GithubConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub indexing: IndexingConfig,
    pub retrieval: RetrievalConfig,
}

impl Settings {
    /// Loads settings from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GerritConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Value for the `Authorization: Basic` header.
    pub token: String,
}

impl Default for GerritConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://gerrit.example.com".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Full repository URLs, e.g. `https://github.com/backstage/backstage`.
    pub repos: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Character budget per chunk.
    pub chunk_size: usize,
    /// Trailing characters of a closed chunk carried into the next one.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub endpoint: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            dimensions: 768,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Chroma,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Chroma server endpoint; unused by the in-process backend.
    pub endpoint: String,
    pub collection: String,
    /// Snapshot file for the in-process backend. When set, writes are
    /// persisted and reloaded across runs.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            endpoint: "http://localhost:8000".to_string(),
            collection: "code-chunks".to_string(),
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub endpoint: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "codellama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Seconds between successful indexing passes.
    pub interval_secs: u64,
    /// Seconds before retrying after a failed pass.
    pub error_retry_secs: u64,
    /// Concurrent repository indexing operations across all sources.
    pub max_concurrent_repos: usize,
    /// Concurrent file tasks within one repository.
    pub max_concurrent_files: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 6 * 60 * 60,
            error_retry_secs: 15 * 60,
            max_concurrent_repos: 5,
            max_concurrent_files: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub retry_max_attempts: u32,
    pub retry_base_delay_secs: u64,
    pub retry_max_delay_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            retry_max_attempts: 3,
            retry_base_delay_secs: 4,
            retry_max_delay_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_values() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.chunk_size, 1000);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(settings.indexing.interval_secs, 21_600);
        assert_eq!(settings.indexing.error_retry_secs, 900);
        assert_eq!(settings.indexing.max_concurrent_repos, 5);
        assert_eq!(settings.retrieval.top_k, 5);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let parsed: Settings = toml::from_str(
            r#"
            [chunking]
            chunk_size = 512

            [store]
            backend = "chroma"
            collection = "repos"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.chunking.chunk_size, 512);
        assert_eq!(parsed.chunking.chunk_overlap, 200);
        assert_eq!(parsed.store.backend, StoreBackend::Chroma);
        assert_eq!(parsed.store.collection, "repos");
        assert_eq!(parsed.llm.model, "codellama");
    }
}
