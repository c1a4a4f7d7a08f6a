//! Object store seam and its OpenDAL implementation
//!
//! The handler only needs two operations from durable storage: write one
//! object and list a prefix. `OpenDalStore` provides them for S3, the local
//! filesystem and memory; the operator is built once and shared.

use crate::error::StoreError;
use async_trait::async_trait;
use opendal::Operator;
use sqs2s3_config::{StorageBackend, StorageConfig};
use std::collections::HashMap;

/// One object write
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// Descriptive metadata, dropped when the backend cannot store it
    pub metadata: HashMap<String, String>,
}

/// One entry returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    /// Last-modified time as reported by the backend
    pub last_modified: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, request: PutRequest) -> Result<(), StoreError>;

    /// Single listing call under `prefix`, no further pagination.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;
}

#[derive(Clone, Debug)]
pub struct OpenDalStore {
    operator: Operator,
}

impl OpenDalStore {
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// Build the operator for the configured backend
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        let operator = match config.backend {
            StorageBackend::Fs => {
                let fs = config.fs.as_ref().ok_or_else(|| {
                    StoreError::Config("fs config required for filesystem backend".to_string())
                })?;

                let builder = opendal::services::Fs::default().root(&fs.path);
                Operator::new(builder)
                    .map_err(|e| {
                        StoreError::Config(format!("Failed to create filesystem operator: {}", e))
                    })?
                    .finish()
            }
            StorageBackend::S3 => {
                let s3 = config.s3.as_ref().ok_or_else(|| {
                    StoreError::Config("s3 config required for S3 backend".to_string())
                })?;

                // Credentials come from the environment (Lambda execution role)
                let mut builder = opendal::services::S3::default()
                    .bucket(&s3.bucket)
                    .region(&s3.region);

                if let Some(endpoint) = &s3.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                if let Some(root) = &s3.root {
                    builder = builder.root(root);
                }

                Operator::new(builder)
                    .map_err(|e| {
                        StoreError::Config(format!("Failed to create S3 operator: {}", e))
                    })?
                    .finish()
            }
            StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
                .map_err(|e| {
                    StoreError::Config(format!("Failed to create memory operator: {}", e))
                })?
                .finish(),
        };

        tracing::debug!(backend = %config.backend, "Storage operator initialized");
        Ok(Self { operator })
    }

    /// In-memory store, mostly for tests and dry runs
    pub fn memory() -> Result<Self, StoreError> {
        Self::from_config(&StorageConfig {
            backend: StorageBackend::Memory,
            fs: None,
            s3: None,
        })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

#[async_trait]
impl ObjectStore for OpenDalStore {
    async fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        let PutRequest {
            key,
            body,
            content_type,
            metadata,
        } = request;
        let capability = self.operator.info().full_capability();

        let mut write = self.operator.write_with(&key, body);
        if capability.write_with_content_type {
            write = write.content_type(content_type);
        }
        if capability.write_with_user_metadata && !metadata.is_empty() {
            write = write.user_metadata(metadata);
        }

        write
            .await
            .map_err(|source| StoreError::Write { key, source })?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let entries = self
            .operator
            .list_with(prefix)
            .recursive(true)
            .await
            .map_err(|source| StoreError::List {
                prefix: prefix.to_string(),
                source,
            })?;

        let mut listed = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.metadata().is_dir() {
                continue;
            }

            // fs and memory listings carry no timestamps; S3 listings do
            let last_modified = match entry.metadata().last_modified() {
                Some(ts) => Some(ts.to_string()),
                None => match self.operator.stat(entry.path()).await {
                    Ok(meta) => meta.last_modified().map(|ts| ts.to_string()),
                    Err(e) => {
                        tracing::debug!(key = entry.path(), error = %e, "stat after list failed");
                        None
                    }
                },
            };

            listed.push(ObjectEntry {
                key: entry.path().to_string(),
                last_modified,
            });
        }

        Ok(listed)
    }
}
