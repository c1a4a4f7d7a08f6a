//! Per-record persistence
//!
//! Parses the record body, writes the wrapped message under a fresh key and,
//! when configured, regenerates the index. Only the message write decides
//! whether the record succeeded.

use crate::error::{Result, WriterError};
use crate::index::IndexRebuilder;
use crate::key::{iso_timestamp, new_message_key};
use crate::message::{InboundRecord, StoredMessage};
use crate::storage::{ObjectStore, PutRequest};
use chrono::Utc;
use serde_json::Value;
use sqs2s3_config::{IndexMode, RuntimeConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Index outcome attached to a persisted record. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    Skipped,
    Rebuilt { entries: usize },
    Failed { reason: String },
}

/// A record that was durably stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub message_id: String,
    pub storage_key: String,
    pub index: IndexStatus,
}

#[derive(Clone)]
pub struct MessagePersister {
    store: Arc<dyn ObjectStore>,
    processor_tag: String,
    indexer: Option<IndexRebuilder>,
}

impl MessagePersister {
    pub fn new(store: Arc<dyn ObjectStore>, processor_tag: impl Into<String>) -> Self {
        Self {
            store,
            processor_tag: processor_tag.into(),
            indexer: None,
        }
    }

    /// Rebuild the index after every successful write
    pub fn with_index_per_write(mut self) -> Self {
        self.indexer = Some(IndexRebuilder::new(self.store.clone()));
        self
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &RuntimeConfig) -> Self {
        let persister = Self::new(store, config.processor.tag.clone());
        match config.index.mode {
            IndexMode::PerWrite => persister.with_index_per_write(),
            IndexMode::PerBatch | IndexMode::Disabled => persister,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn persist(&self, record: &InboundRecord) -> Result<PersistOutcome> {
        let message_id = record.message_id.as_str();
        tracing::debug!(message_id, bytes = record.body.len(), "Processing message");

        let payload: Value = serde_json::from_str(&record.body)
            .map_err(|e| WriterError::malformed_payload(message_id, e))?;

        let received_at = Utc::now();
        let key = new_message_key(received_at);
        let stored = StoredMessage {
            message_id,
            received_at,
            original_payload: &payload,
            processed_by: &self.processor_tag,
        };
        let body = stored
            .to_pretty_json()
            .map_err(|e| WriterError::encode(message_id, e))?;

        let metadata = HashMap::from([
            ("message-id".to_string(), message_id.to_string()),
            ("processed-at".to_string(), iso_timestamp(received_at)),
        ]);

        self.store
            .put(PutRequest {
                key: key.clone(),
                body,
                content_type: "application/json",
                metadata,
            })
            .await
            .map_err(|e| WriterError::storage_write(message_id, e))?;

        tracing::info!(message_id, key = %key, "Stored message");

        let index = match &self.indexer {
            Some(indexer) => match indexer.rebuild().await {
                Ok(report) => IndexStatus::Rebuilt {
                    entries: report.entries,
                },
                Err(err) => {
                    tracing::warn!(message_id, error = %err, "Index rebuild failed; message still stored");
                    IndexStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            },
            None => IndexStatus::Skipped,
        };

        Ok(PersistOutcome {
            message_id: message_id.to_string(),
            storage_key: key,
            index,
        })
    }
}
