//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level random-access storage backend for burrowdb.
///
/// Storage backends are **opaque byte stores**. They provide positioned
/// reads and writes plus size management. burrowdb owns all file format
/// interpretation - backends do not understand headers, blocks or records.
///
/// # Invariants
///
/// - `read_at` returns exactly the bytes previously written at that range
/// - `write_at` at or past the current end grows the storage
/// - `sync` makes all prior writes durable (data and metadata)
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::FileBackend`] - for persistent storage
/// - [`super::InMemoryBackend`] - for testing
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`](crate::StorageError) if the
    /// range extends beyond the current size, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` starting at `offset`.
    ///
    /// Writing at or past the current end extends the storage; any gap
    /// between the old end and `offset` reads back as zeroes.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn write_at(&self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the storage to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` exceeds the current size or the
    /// truncation fails.
    fn truncate(&self, new_size: u64) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// After this returns successfully, all previously written data is
    /// guaranteed to survive process termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&self) -> StorageResult<()>;
}
