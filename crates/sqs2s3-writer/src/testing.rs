//! Fault injection for tests

use crate::error::StoreError;
use crate::storage::{ObjectEntry, ObjectStore, PutRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Store wrapper that rejects selected operations and delegates the rest
pub struct FaultyStore {
    inner: Arc<dyn ObjectStore>,
    failing_prefixes: Vec<String>,
    fail_list: bool,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            failing_prefixes: Vec::new(),
            fail_list: false,
        }
    }

    /// Reject every write whose key starts with `prefix`
    pub fn fail_writes_under(mut self, prefix: impl Into<String>) -> Self {
        self.failing_prefixes.push(prefix.into());
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.fail_list = true;
        self
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put(&self, request: PutRequest) -> Result<(), StoreError> {
        if self
            .failing_prefixes
            .iter()
            .any(|prefix| request.key.starts_with(prefix.as_str()))
        {
            return Err(StoreError::Write {
                key: request.key,
                source: opendal::Error::new(
                    opendal::ErrorKind::PermissionDenied,
                    "injected write failure",
                ),
            });
        }
        self.inner.put(request).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        if self.fail_list {
            return Err(StoreError::List {
                prefix: prefix.to_string(),
                source: opendal::Error::new(opendal::ErrorKind::Unexpected, "injected list failure"),
            });
        }
        self.inner.list(prefix).await
    }
}
