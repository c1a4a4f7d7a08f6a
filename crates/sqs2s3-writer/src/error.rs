//! Error types for the writer crate

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Message body is not valid JSON
    E001MalformedPayload,
    /// E002: Writing the message object failed
    E002StorageWrite,
    /// E003: Regenerating index.html failed
    E003IndexRebuild,
    /// E004: Serializing the stored message failed
    E004Encode,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001MalformedPayload => "E001",
            Self::E002StorageWrite => "E002",
            Self::E003IndexRebuild => "E003",
            Self::E004Encode => "E004",
        }
    }
}

/// Failures raised by the object store seam
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write to '{key}' failed: {source}")]
    Write {
        key: String,
        #[source]
        source: opendal::Error,
    },

    #[error("listing '{prefix}' failed: {source}")]
    List {
        prefix: String,
        #[source]
        source: opendal::Error,
    },

    #[error("invalid storage configuration: {0}")]
    Config(String),
}

/// Errors that can occur while persisting a single message
#[derive(Debug, Error)]
pub enum WriterError {
    /// The record body could not be parsed as JSON
    #[error("[{code}] Malformed payload in message '{message_id}': {reason}")]
    MalformedPayload {
        code: &'static str,
        message_id: String,
        reason: String,
    },

    /// The backend rejected the write
    #[error("[{code}] Failed to store message '{message_id}': {source}")]
    StorageWrite {
        code: &'static str,
        message_id: String,
        #[source]
        source: StoreError,
    },

    /// The parsed payload could not be written back out as JSON
    #[error("[{code}] Failed to encode message '{message_id}': {source}")]
    Encode {
        code: &'static str,
        message_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The index page could not be regenerated
    #[error("[{code}] Index rebuild failed: {source}")]
    IndexRebuild {
        code: &'static str,
        #[source]
        source: StoreError,
    },
}

impl WriterError {
    pub fn malformed_payload(message_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            code: ErrorCode::E001MalformedPayload.as_str(),
            message_id: message_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn storage_write(message_id: impl Into<String>, source: StoreError) -> Self {
        Self::StorageWrite {
            code: ErrorCode::E002StorageWrite.as_str(),
            message_id: message_id.into(),
            source,
        }
    }

    pub fn encode(message_id: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            code: ErrorCode::E004Encode.as_str(),
            message_id: message_id.into(),
            source,
        }
    }

    pub fn index_rebuild(source: StoreError) -> Self {
        Self::IndexRebuild {
            code: ErrorCode::E003IndexRebuild.as_str(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedPayload { .. } => ErrorCode::E001MalformedPayload,
            Self::StorageWrite { .. } => ErrorCode::E002StorageWrite,
            Self::Encode { .. } => ErrorCode::E004Encode,
            Self::IndexRebuild { .. } => ErrorCode::E003IndexRebuild,
        }
    }

    /// Message the failure belongs to, if it is tied to one record
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::MalformedPayload { message_id, .. }
            | Self::StorageWrite { message_id, .. }
            | Self::Encode { message_id, .. } => Some(message_id),
            Self::IndexRebuild { .. } => None,
        }
    }

    /// Whether redelivering the same message could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageWrite { .. })
    }
}

/// Result type alias for WriterError
pub type Result<T> = std::result::Result<T, WriterError>;
