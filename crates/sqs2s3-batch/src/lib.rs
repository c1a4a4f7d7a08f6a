//! Batch dispatch for sqs2s3
//!
//! Runs the message persister over every record of one delivered batch and
//! decides whether the batch as a whole succeeded. Two policies:
//! - fail-fast: records in order, stop at the first failure
//! - best-effort: records concurrently, collect every outcome, then report
//!
//! Nothing is retried here; a failed batch is surfaced to the invoker, which
//! owns redelivery.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use sqs2s3_config::{DispatchMode, IndexMode, RuntimeConfig};
use sqs2s3_writer::{
    IndexRebuilder, IndexStatus, InboundRecord, MessagePersister, ObjectStore, PersistOutcome,
    WriterError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Queue delivery payload: `{"Records": [{"messageId": .., "body": ..}, ..]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<InboundRecord>,
}

/// Successful batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub processed: usize,
    /// Per-record outcomes in input order
    pub outcomes: Vec<PersistOutcome>,
    /// Result of the per-batch index rebuild, if one ran
    pub index: IndexStatus,
}

impl BatchReport {
    pub fn summary(&self) -> String {
        format!("Processed {} messages successfully", self.processed)
    }
}

/// One record that could not be persisted
#[derive(Debug)]
pub struct RecordFailure {
    pub message_id: String,
    pub error: WriterError,
}

#[derive(Debug, Error)]
pub enum BatchError {
    /// Fail-fast stopped at the first failing record
    #[error("Batch aborted at message '{message_id}' after {stored} stored: {source}")]
    Aborted {
        message_id: String,
        stored: usize,
        #[source]
        source: WriterError,
    },

    /// Best-effort finished with at least one failed record
    #[error("{failed} of {total} messages failed to process")]
    PartialFailure {
        failed: usize,
        total: usize,
        failures: Vec<RecordFailure>,
        stored: Vec<PersistOutcome>,
    },
}

impl BatchError {
    pub fn failed_count(&self) -> usize {
        match self {
            Self::Aborted { .. } => 1,
            Self::PartialFailure { failed, .. } => *failed,
        }
    }

    /// Records that were stored before the batch was declared failed
    pub fn stored_count(&self) -> usize {
        match self {
            Self::Aborted { stored, .. } => *stored,
            Self::PartialFailure { stored, .. } => stored.len(),
        }
    }
}

#[derive(Clone)]
pub struct BatchDispatcher {
    persister: MessagePersister,
    mode: DispatchMode,
    max_concurrency: usize,
    batch_indexer: Option<IndexRebuilder>,
}

impl BatchDispatcher {
    pub fn new(persister: MessagePersister, mode: DispatchMode) -> Self {
        Self {
            persister,
            mode,
            max_concurrency: 64,
            batch_indexer: None,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Rebuild the index once after each batch that stored something
    pub fn with_index_per_batch(mut self) -> Self {
        self.batch_indexer = Some(IndexRebuilder::new(self.persister.store().clone()));
        self
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &RuntimeConfig) -> Self {
        let persister = MessagePersister::from_config(store, config);
        let dispatcher = Self::new(persister, config.dispatch.mode)
            .with_max_concurrency(config.dispatch.max_concurrency);

        match config.index.mode {
            IndexMode::PerBatch => dispatcher.with_index_per_batch(),
            IndexMode::PerWrite | IndexMode::Disabled => dispatcher,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub async fn dispatch(&self, records: &[InboundRecord]) -> Result<BatchReport, BatchError> {
        if records.is_empty() {
            info!("Received empty batch, nothing to do");
            return Ok(BatchReport {
                processed: 0,
                outcomes: Vec::new(),
                index: IndexStatus::Skipped,
            });
        }

        info!(records = records.len(), mode = %self.mode, "Processing batch");

        let result = match self.mode {
            DispatchMode::FailFast => self.dispatch_fail_fast(records).await,
            DispatchMode::BestEffort => self.dispatch_best_effort(records).await,
        };

        match result {
            Ok(outcomes) => {
                let index = self.rebuild_after_batch(outcomes.len()).await;
                info!(processed = outcomes.len(), "Batch complete");
                Ok(BatchReport {
                    processed: outcomes.len(),
                    outcomes,
                    index,
                })
            }
            Err(err) => {
                // The index only reflects what was stored; the batch still fails
                let index = self.rebuild_after_batch(err.stored_count()).await;
                error!(
                    failed = err.failed_count(),
                    stored = err.stored_count(),
                    total = records.len(),
                    index = ?index,
                    error = %err,
                    "Batch failed"
                );
                Err(err)
            }
        }
    }

    async fn dispatch_fail_fast(
        &self,
        records: &[InboundRecord],
    ) -> Result<Vec<PersistOutcome>, BatchError> {
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            match self.persister.persist(record).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(
                        message_id = %record.message_id,
                        error = %err,
                        skipped = records.len() - outcomes.len() - 1,
                        "Failed to process message, aborting batch"
                    );
                    return Err(BatchError::Aborted {
                        message_id: record.message_id.clone(),
                        stored: outcomes.len(),
                        source: err,
                    });
                }
            }
        }

        Ok(outcomes)
    }

    async fn dispatch_best_effort(
        &self,
        records: &[InboundRecord],
    ) -> Result<Vec<PersistOutcome>, BatchError> {
        // `buffered` runs up to max_concurrency persists at once and yields in input order
        let results: Vec<_> = stream::iter(records.iter().map(|record| async move {
            (record, self.persister.persist(record).await)
        }))
        .buffered(self.max_concurrency)
        .collect()
        .await;

        let mut stored = Vec::with_capacity(records.len());
        let mut failures = Vec::new();
        for (record, result) in results {
            match result {
                Ok(outcome) => stored.push(outcome),
                Err(err) => {
                    error!(
                        message_id = %record.message_id,
                        error = %err,
                        "Failed to process message"
                    );
                    failures.push(RecordFailure {
                        message_id: record.message_id.clone(),
                        error: err,
                    });
                }
            }
        }

        if failures.is_empty() {
            return Ok(stored);
        }

        Err(BatchError::PartialFailure {
            failed: failures.len(),
            total: records.len(),
            failures,
            stored,
        })
    }

    async fn rebuild_after_batch(&self, stored: usize) -> IndexStatus {
        let Some(indexer) = &self.batch_indexer else {
            return IndexStatus::Skipped;
        };
        if stored == 0 {
            return IndexStatus::Skipped;
        }

        match indexer.rebuild().await {
            Ok(report) => IndexStatus::Rebuilt {
                entries: report.entries,
            },
            Err(err) => {
                warn!(error = %err, "Index rebuild after batch failed");
                IndexStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqs2s3_writer::testing::FaultyStore;
    use sqs2s3_writer::{is_message_key, OpenDalStore, INDEX_KEY, MESSAGE_PREFIX};

    fn records(bodies: &[&str]) -> Vec<InboundRecord> {
        bodies
            .iter()
            .enumerate()
            .map(|(i, body)| InboundRecord::new(format!("msg-{}", i + 1), *body))
            .collect()
    }

    fn dispatcher(store: Arc<dyn ObjectStore>, mode: DispatchMode) -> BatchDispatcher {
        BatchDispatcher::new(MessagePersister::new(store, "test-processor"), mode)
    }

    async fn stored_keys(store: &OpenDalStore) -> Vec<String> {
        store
            .list(MESSAGE_PREFIX)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.key)
            .filter(|key| is_message_key(key))
            .collect()
    }

    #[tokio::test]
    async fn test_all_valid_records_succeed_in_both_modes() {
        for mode in [DispatchMode::FailFast, DispatchMode::BestEffort] {
            let store = Arc::new(OpenDalStore::memory().unwrap());
            let report = dispatcher(store.clone(), mode)
                .dispatch(&records(&[r#"{"a":1}"#, "[]", "42"]))
                .await
                .unwrap();

            assert_eq!(report.processed, 3);
            assert_eq!(report.summary(), "Processed 3 messages successfully");
            let ids: Vec<_> = report.outcomes.iter().map(|o| o.message_id.as_str()).collect();
            assert_eq!(ids, vec!["msg-1", "msg-2", "msg-3"]);
            assert_eq!(stored_keys(&store).await.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let report = dispatcher(store.clone(), DispatchMode::BestEffort)
            .with_index_per_batch()
            .dispatch(&[])
            .await
            .unwrap();

        assert_eq!(report.processed, 0);
        assert_eq!(report.index, IndexStatus::Skipped);
        assert!(!store.operator().exists(INDEX_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let err = dispatcher(store.clone(), DispatchMode::FailFast)
            .dispatch(&records(&["{}", "not json", "{}"]))
            .await
            .unwrap_err();

        match &err {
            BatchError::Aborted {
                message_id,
                stored,
                source,
            } => {
                assert_eq!(message_id, "msg-2");
                assert_eq!(*stored, 1);
                assert!(matches!(source, WriterError::MalformedPayload { .. }));
            }
            other => panic!("expected abort, got {other:?}"),
        }
        assert_eq!(err.failed_count(), 1);
        // msg-3 was never attempted
        assert_eq!(stored_keys(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_reports_aggregate_failure() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let err = dispatcher(store.clone(), DispatchMode::BestEffort)
            .dispatch(&records(&["{}", "not json", r#"{"x": [1]}"#, "{oops"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "2 of 4 messages failed to process");
        match &err {
            BatchError::PartialFailure {
                failed,
                total,
                failures,
                stored,
            } => {
                assert_eq!((*failed, *total), (2, 4));
                let failed_ids: Vec<_> = failures.iter().map(|f| f.message_id.as_str()).collect();
                assert_eq!(failed_ids, vec!["msg-2", "msg-4"]);
                assert_eq!(stored.len(), 2);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(stored_keys(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_best_effort_storage_failures() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let faulty = Arc::new(FaultyStore::new(store.clone()).fail_writes_under(MESSAGE_PREFIX));
        let err = dispatcher(faulty, DispatchMode::BestEffort)
            .with_max_concurrency(2)
            .dispatch(&records(&["{}", "{}", "{}"]))
            .await
            .unwrap_err();

        assert_eq!(err.failed_count(), 3);
        assert_eq!(err.stored_count(), 0);
        if let BatchError::PartialFailure { failures, .. } = &err {
            assert!(failures.iter().all(|f| f.error.is_retryable()));
        }
    }

    #[tokio::test]
    async fn test_index_rebuilt_once_per_batch() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let report = dispatcher(store.clone(), DispatchMode::BestEffort)
            .with_index_per_batch()
            .dispatch(&records(&["{}", "{}"]))
            .await
            .unwrap();

        assert_eq!(report.index, IndexStatus::Rebuilt { entries: 2 });
        assert!(report
            .outcomes
            .iter()
            .all(|outcome| outcome.index == IndexStatus::Skipped));
        assert!(store.operator().exists(INDEX_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_index_failure_is_not_fatal() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let faulty = Arc::new(FaultyStore::new(store.clone()).fail_listing());
        let report = dispatcher(faulty, DispatchMode::FailFast)
            .with_index_per_batch()
            .dispatch(&records(&["{}"]))
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        assert!(matches!(report.index, IndexStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_failed_batch_still_indexes_stored_records() {
        let store = Arc::new(OpenDalStore::memory().unwrap());
        let err = dispatcher(store.clone(), DispatchMode::BestEffort)
            .with_index_per_batch()
            .dispatch(&records(&["{}", "not json"]))
            .await
            .unwrap_err();

        assert_eq!(err.stored_count(), 1);
        let html = String::from_utf8(store.operator().read(INDEX_KEY).await.unwrap().to_vec())
            .unwrap();
        assert_eq!(html.matches("<li>").count(), 1);
    }

    #[test]
    fn test_from_config() {
        let mut config = RuntimeConfig::default();
        config.dispatch.mode = DispatchMode::BestEffort;
        config.dispatch.max_concurrency = 5;
        config.index.mode = IndexMode::PerBatch;
        let store: Arc<dyn ObjectStore> = Arc::new(OpenDalStore::memory().unwrap());

        let dispatcher = BatchDispatcher::from_config(store, &config);
        assert_eq!(dispatcher.mode(), DispatchMode::BestEffort);
        assert_eq!(dispatcher.max_concurrency, 5);
        assert!(dispatcher.batch_indexer.is_some());
    }

    #[test]
    fn test_batch_event_deserialize() {
        let event: BatchEvent = serde_json::from_str(
            r#"{"Records": [
                {"messageId": "1", "body": "{\"k\": \"v\"}", "eventSource": "aws:sqs"},
                {"messageId": "2", "body": "not json"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(event.records.len(), 2);
        assert_eq!(event.records[1], InboundRecord::new("2", "not json"));

        let empty: BatchEvent = serde_json::from_str("{}").unwrap();
        assert!(empty.records.is_empty());
    }
}
