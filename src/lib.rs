pub mod cli;
pub mod config;
pub mod embedder;
pub mod error;
pub mod index;
pub mod llm;
pub mod rag;
pub mod source;
pub mod store;

pub use config::Settings;
pub use index::{IndexingScheduler, RepositoryIndexer, SeenSet};
pub use rag::{QueryOutcome, RagPipeline};
