//! Message persistence for sqs2s3
//!
//! Turns queued records into JSON objects under `messages/` and keeps a
//! static `index.html` listing of them, on any OpenDAL backend.

mod error;
mod index;
mod key;
mod message;
mod persist;
mod storage;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{ErrorCode, Result, StoreError, WriterError};
pub use index::{render_index, IndexRebuilder, IndexReport};
pub use key::{
    is_message_key, iso_timestamp, message_key, new_message_key, INDEX_KEY, MESSAGE_PREFIX,
};
pub use message::{InboundRecord, StoredMessage};
pub use persist::{IndexStatus, MessagePersister, PersistOutcome};
pub use storage::{ObjectEntry, ObjectStore, OpenDalStore, PutRequest};

// Re-export so callers can build operators without a direct dependency
pub use opendal;
