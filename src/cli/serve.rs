use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Settings;
use crate::embedder::create_embedder;
use crate::index::{IndexTask, IndexingScheduler, RepositoryIndexer, SeenSet};
use crate::store::create_store;

/// Runs the periodic indexing scheduler until the process is interrupted.
pub async fn run_serve(settings: &Settings) -> Result<()> {
    let embedder = create_embedder(&settings.embedding);
    embedder.health_check().await?;

    let store = create_store(&settings.store);
    let indexer: Arc<dyn IndexTask> = Arc::new(RepositoryIndexer::new(
        settings,
        embedder,
        store,
        Arc::new(SeenSet::new()),
    ));

    let scheduler = IndexingScheduler::new(indexer, &settings.indexing);
    let _loop = scheduler.start();
    info!(
        interval_secs = settings.indexing.interval_secs,
        "indexing scheduler started"
    );

    tokio::signal::ctrl_c().await?;
    let status = scheduler.status();
    info!(last_indexed_at = ?status.last_indexed_at, "shutting down");
    Ok(())
}
