//! Error types for storage backends.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage backend operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read extended past the end of the storage.
    #[error("read past end: offset {offset} + len {len} exceeds size {size}")]
    ReadPastEnd {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Current storage size.
        size: u64,
    },

    /// A truncation would grow the storage.
    #[error("cannot truncate to {requested}: storage size is {size}")]
    TruncateBeyondEnd {
        /// Requested new size.
        requested: u64,
        /// Current storage size.
        size: u64,
    },
}
