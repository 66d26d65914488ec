use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::IndexingConfig;
use crate::error::IndexError;
use crate::index::indexer::{IndexReport, RepositoryIndexer};

/// One full indexing pass. A trait so the scheduling loop can be exercised
/// against mocks.
#[async_trait]
pub trait IndexTask: Send + Sync {
    async fn run(&self) -> Result<IndexReport, IndexError>;
}

#[async_trait]
impl IndexTask for RepositoryIndexer {
    async fn run(&self) -> Result<IndexReport, IndexError> {
        self.index_all().await
    }
}

/// Point-in-time view of the scheduler, reset on process restart.
#[derive(Debug, Clone, Default)]
pub struct IndexingStatus {
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub is_running: bool,
}

/// Runs indexing passes forever: a successful pass sleeps the regular
/// interval, a failed pass is logged here (the single boundary deciding
/// retry cadence) and retried sooner. The loop never terminates on error.
pub struct IndexingScheduler {
    task: Arc<dyn IndexTask>,
    interval: Duration,
    error_retry: Duration,
    status: Arc<Mutex<IndexingStatus>>,
}

impl IndexingScheduler {
    pub fn new(task: Arc<dyn IndexTask>, config: &IndexingConfig) -> Self {
        Self {
            task,
            interval: Duration::from_secs(config.interval_secs),
            error_retry: Duration::from_secs(config.error_retry_secs),
            status: Arc::new(Mutex::new(IndexingStatus::default())),
        }
    }

    pub fn status(&self) -> IndexingStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Starts the periodic loop. Calling again while it is already running
    /// is a no-op and returns `None`.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            if status.is_running {
                warn!("indexing is already in progress");
                return None;
            }
            status.is_running = true;
        }

        let task = Arc::clone(&self.task);
        let status = Arc::clone(&self.status);
        let interval = self.interval;
        let error_retry = self.error_retry;

        Some(tokio::spawn(async move {
            loop {
                info!("starting repository indexing");
                match task.run().await {
                    Ok(report) => {
                        status
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .last_indexed_at = Some(Utc::now());
                        info!(
                            repos = report.repos_indexed,
                            files = report.files_indexed,
                            chunks = report.chunks_written,
                            "repository indexing completed"
                        );
                        tokio::time::sleep(interval).await;
                    }
                    Err(err) => {
                        error!("indexing pass failed, retrying sooner: {err}");
                        tokio::time::sleep(error_retry).await;
                    }
                }
            }
        }))
    }
}
