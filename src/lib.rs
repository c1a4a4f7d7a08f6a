// Local tooling for sqs2s3
//
// Replays captured SQS batch events through the same dispatcher the Lambda
// uses, and rebuilds index.html on demand (e.g. after a bulk import).

use anyhow::{Context, Result};
use sqs2s3_batch::{BatchDispatcher, BatchEvent, BatchReport};
use sqs2s3_config::{DispatchMode, RuntimeConfig};
use sqs2s3_writer::{IndexRebuilder, IndexReport, ObjectStore, OpenDalStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub use sqs2s3_config::init_tracing;

/// Build the configured store handle
pub fn init_store(config: &RuntimeConfig) -> Result<Arc<dyn ObjectStore>> {
    let store = OpenDalStore::from_config(&config.storage)
        .with_context(|| format!("Failed to initialize {} storage", config.storage.backend))?;
    Ok(Arc::new(store))
}

/// Parse a captured event file (`{"Records": [..]}`)
pub async fn read_event(path: &Path) -> Result<BatchEvent> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read event file: {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("Failed to parse event file: {}", path.display()))
}

/// Run one event file through the dispatcher against the configured store
pub async fn replay(
    config: &RuntimeConfig,
    event_path: &Path,
    mode: Option<DispatchMode>,
) -> Result<BatchReport> {
    let event = read_event(event_path).await?;
    let store = init_store(config)?;
    replay_event(store, config, event, mode).await
}

/// Dispatch an already-parsed event; `mode` overrides `dispatch.mode`
pub async fn replay_event(
    store: Arc<dyn ObjectStore>,
    config: &RuntimeConfig,
    event: BatchEvent,
    mode: Option<DispatchMode>,
) -> Result<BatchReport> {
    let mut config = config.clone();
    if let Some(mode) = mode {
        config.dispatch.mode = mode;
    }

    let dispatcher = BatchDispatcher::from_config(store, &config);
    info!(
        records = event.records.len(),
        mode = %dispatcher.mode(),
        "Replaying batch"
    );

    let report = dispatcher.dispatch(&event.records).await?;
    Ok(report)
}

/// Regenerate index.html from the current `messages/` listing
pub async fn rebuild_index(store: Arc<dyn ObjectStore>) -> Result<IndexReport> {
    let report = IndexRebuilder::new(store)
        .rebuild()
        .await
        .context("Failed to rebuild index")?;
    info!(entries = report.entries, "Index rebuilt");
    Ok(report)
}
