use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{cosine_similarity, ChunkMetadata, ScoredChunk, VectorStore};
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    id: String,
    content: String,
    vector: Vec<f32>,
    metadata: ChunkMetadata,
}

/// In-process vector store with cosine ranking. With a snapshot path set,
/// every write is persisted through an atomic temp-file rename and reloaded
/// on construction, so one-shot index and query commands can share an index
/// across processes.
pub struct MemoryStore {
    entries: RwLock<Vec<Entry>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            snapshot_path: None,
        }
    }

    pub fn with_snapshot(path: PathBuf) -> Self {
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(path = %path.display(), "ignoring corrupt snapshot: {err}");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            entries: RwLock::new(entries),
            snapshot_path: Some(path),
        }
    }

    fn persist(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = path.with_extension("tmp");
        fs::write(&temp, serde_json::to_vec(entries)?)?;
        fs::rename(temp, path)?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add_documents(
        &self,
        documents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<(), StoreError> {
        if documents.len() != embeddings.len() || documents.len() != metadatas.len() {
            return Err(StoreError::Shape);
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for ((content, vector), metadata) in documents
            .into_iter()
            .zip(embeddings.into_iter())
            .zip(metadatas.into_iter())
        {
            entries.push(Entry {
                id: Uuid::new_v4().to_string(),
                content,
                vector,
                metadata,
            });
        }
        self.persist(&entries)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let mut results: Vec<ScoredChunk> = entries
            .iter()
            .map(|entry| ScoredChunk {
                content: entry.content.clone(),
                metadata: entry.metadata.clone(),
                score: cosine_similarity(embedding, &entry.vector),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metadata(path: &str) -> ChunkMetadata {
        ChunkMetadata {
            file_path: path.to_string(),
            repo_name: "repo".to_string(),
            file_type: "rs".to_string(),
            file_identity: format!("id-{path}"),
            content_hash: "hash".to_string(),
            start_offset: 0,
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ranks_by_cosine_similarity() {
        let store = MemoryStore::new();
        store
            .add_documents(
                vec!["far".into(), "near".into()],
                vec![vec![0.0, 1.0], vec![1.0, 0.1]],
                vec![metadata("far.rs"), metadata("near.rs")],
            )
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "near");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn query_truncates_to_k() {
        let store = MemoryStore::new();
        store
            .add_documents(
                vec!["a".into(), "b".into(), "c".into()],
                vec![vec![1.0], vec![0.5], vec![0.1]],
                vec![metadata("a"), metadata("b"), metadata("c")],
            )
            .await
            .unwrap();

        let results = store.query(&[1.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn mismatched_arrays_are_rejected() {
        let store = MemoryStore::new();
        let result = store
            .add_documents(vec!["a".into()], vec![], vec![metadata("a")])
            .await;
        assert!(matches!(result, Err(StoreError::Shape)));
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("index.json");

        let store = MemoryStore::with_snapshot(path.clone());
        store
            .add_documents(
                vec!["persisted".into()],
                vec![vec![1.0, 0.0]],
                vec![metadata("kept.rs")],
            )
            .await
            .unwrap();

        let reloaded = MemoryStore::with_snapshot(path);
        assert_eq!(reloaded.count().await.unwrap(), 1);
        let results = reloaded.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].content, "persisted");
        assert_eq!(results[0].metadata.file_path, "kept.rs");
    }
}
