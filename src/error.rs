use thiserror::Error;

/// Failures reaching a repository source backend.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to fetch archive for {repo}: {reason}")]
    Fetch { repo: String, reason: String },

    #[error("invalid project listing: {0}")]
    Listing(#[from] serde_json::Error),
}

/// Failures unpacking a downloaded archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt or unreadable archive: {0}")]
    Archive(#[from] std::io::Error),

    #[error("corrupt zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Failures producing embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding backend error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("backend returned {got} embeddings for {expected} inputs")]
    Shape { expected: usize, got: usize },
}

/// Failures reading from or writing to the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vector store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vector store error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("documents, embeddings and metadata must have equal length")]
    Shape,

    #[error("failed to persist index snapshot: {0}")]
    Persist(#[from] std::io::Error),

    #[error("corrupt index snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Failures from the text-generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation backend error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Repository-level indexing failures. File-level problems are absorbed
/// before they reach this type.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{failed} of {total} repositories failed to index")]
    Partial { failed: usize, total: usize },
}

/// Query-path failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("retrieval failed after {attempts} attempts: {source}")]
    Retrieval {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Failures loading the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
