//! Error types for burrowdb core.

use crate::codec::CodecError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in burrowdb core operations.
///
/// I/O failures abort the operation and may leave the in-memory state
/// ahead of the last commit; callers should
/// [`rollback`](crate::PersistentStore::rollback) before continuing.
/// Deleting or loading an unknown id is **not** an error - both are
/// defined no-ops.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] burrowdb_storage::StorageError),

    /// Wire codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A record's declared streamed length did not match the bytes it
    /// actually encoded. This is data corruption or a contract bug in the
    /// record implementation, never retried.
    #[error(
        "record {id} length mismatch: streamed_len() declared {declared} but encode() wrote {actual} bytes"
    )]
    RecordLengthMismatch {
        /// Id of the offending record.
        id: i32,
        /// Length the record declared.
        declared: usize,
        /// Length the record actually encoded.
        actual: usize,
    },

    /// The index block read at open time is unreadable or internally
    /// inconsistent. There is no automatic rebuild; the store cannot open.
    #[error("corrupt index block: {message}")]
    CorruptIndexBlock {
        /// Description of the inconsistency.
        message: String,
    },
}

impl CoreError {
    /// Creates a corrupt index block error.
    pub fn corrupt_index(message: impl Into<String>) -> Self {
        Self::CorruptIndexBlock {
            message: message.into(),
        }
    }
}
