pub mod archive;
pub mod chunker;
pub mod dedup;
pub mod indexer;
pub mod scheduler;

pub use archive::{extract, ArchiveFormat};
pub use chunker::{file_type, Chunk, Chunker};
pub use dedup::{content_hash, file_identity, SeenSet};
pub use indexer::{IndexReport, RepositoryIndexer};
pub use scheduler::{IndexTask, IndexingScheduler, IndexingStatus};
