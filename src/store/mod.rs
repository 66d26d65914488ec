mod chroma;
mod memory;

pub use chroma::ChromaStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;

/// Metadata attached to every stored chunk. Written once at indexing time and
/// returned verbatim with query results; the pipeline never updates or
/// deletes entries afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub repo_name: String,
    pub file_type: String,
    pub file_identity: String,
    pub content_hash: String,
    pub start_offset: usize,
    pub indexed_at: DateTime<Utc>,
}

/// One query hit, ranked by the store's similarity measure.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Nearest-neighbor store contract. Implementations own their internal
/// indexing and ranking; callers only rely on descending-relevance order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends parallel arrays of documents, embeddings and metadata. All
    /// three must have equal length; each index is one stored entry.
    async fn add_documents(
        &self,
        documents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<(), StoreError>;

    /// Returns up to `k` nearest entries, most relevant first.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, StoreError>;
}

pub fn create_store(config: &StoreConfig) -> Arc<dyn VectorStore> {
    match config.backend {
        StoreBackend::Memory => match &config.snapshot_path {
            Some(path) => Arc::new(MemoryStore::with_snapshot(path.clone())),
            None => Arc::new(MemoryStore::new()),
        },
        StoreBackend::Chroma => Arc::new(ChromaStore::new(&config.endpoint, &config.collection)),
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn cosine_similarity_mismatched_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_similarity_empty() {
        let a: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&a, &a), 0.0);
    }
}
