use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use super::{ChunkMetadata, ScoredChunk, VectorStore};
use crate::error::StoreError;

/// REST client for a Chroma server. The collection is resolved lazily with
/// get-or-create semantics and cached for the life of the client.
pub struct ChromaStore {
    endpoint: String,
    collection: String,
    collection_id: OnceCell<String>,
    client: Client,
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct AddRequest {
    ids: Vec<String>,
    documents: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<Value>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    include: [&'static str; 3],
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Vec<Vec<Value>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct CountResponse(usize);

impl ChromaStore {
    pub fn new(endpoint: &str, collection: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            collection_id: OnceCell::new(),
            client,
        }
    }

    async fn collection_id(&self) -> Result<&str, StoreError> {
        self.collection_id
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .post(format!("{}/api/v1/collections", self.endpoint))
                    .json(&CreateCollectionRequest {
                        name: &self.collection,
                        get_or_create: true,
                    })
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(StoreError::Api { status, body });
                }

                let parsed: CollectionResponse = response.json().await?;
                debug!(collection = %self.collection, id = %parsed.id, "resolved collection");
                Ok(parsed.id)
            })
            .await
            .map(String::as_str)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api { status, body })
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn add_documents(
        &self,
        documents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<(), StoreError> {
        if documents.len() != embeddings.len() || documents.len() != metadatas.len() {
            return Err(StoreError::Shape);
        }
        if documents.is_empty() {
            return Ok(());
        }

        let collection_id = self.collection_id().await?;
        let request = AddRequest {
            ids: documents.iter().map(|_| Uuid::new_v4().to_string()).collect(),
            documents,
            embeddings,
            metadatas: metadatas
                .into_iter()
                .map(|metadata| serde_json::to_value(metadata))
                .collect::<Result<_, _>>()?,
        };

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{collection_id}/add",
                self.endpoint
            ))
            .json(&request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let collection_id = self.collection_id().await?;
        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: k,
            include: ["documents", "metadatas", "distances"],
        };

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{collection_id}/query",
                self.endpoint
            ))
            .json(&request)
            .send()
            .await?;
        let parsed: QueryResponse = Self::check(response).await?.json().await?;

        let documents = parsed.documents.into_iter().next().unwrap_or_default();
        let metadatas = parsed.metadatas.into_iter().next().unwrap_or_default();
        let distances = parsed.distances.into_iter().next().unwrap_or_default();

        let mut chunks = Vec::with_capacity(documents.len());
        for (index, (content, metadata)) in documents.into_iter().zip(metadatas).enumerate() {
            let metadata: ChunkMetadata = serde_json::from_value(metadata)?;
            // Chroma reports distance; flip it so larger means closer.
            let score = 1.0 - distances.get(index).copied().unwrap_or(0.0);
            chunks.push(ScoredChunk {
                content,
                metadata,
                score,
            });
        }
        Ok(chunks)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let collection_id = self.collection_id().await?;
        let response = self
            .client
            .get(format!(
                "{}/api/v1/collections/{collection_id}/count",
                self.endpoint
            ))
            .send()
            .await?;
        let parsed: CountResponse = Self::check(response).await?.json().await?;
        Ok(parsed.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_trimmed() {
        let store = ChromaStore::new("http://localhost:8000/", "code-chunks");
        assert_eq!(store.endpoint, "http://localhost:8000");
        assert_eq!(store.collection, "code-chunks");
    }

    #[tokio::test]
    async fn empty_add_is_a_no_op() {
        // Must not touch the network at all.
        let store = ChromaStore::new("http://localhost:1", "code-chunks");
        store
            .add_documents(Vec::new(), Vec::new(), Vec::new())
            .await
            .unwrap();
    }
}
