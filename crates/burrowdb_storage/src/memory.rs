//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A volatile storage backend over a byte vector.
///
/// Useful for tests and for callers that want store semantics without a
/// file. `sync` is a no-op; nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-loaded with `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Copies out the full contents, mainly for test assertions.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut store = self.data.write();
        let end = offset as usize + data.len();
        if end > store.len() {
            store.resize(end, 0);
        }
        store[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let backend = InMemoryBackend::new();
        backend.write_at(0, b"abc").unwrap();
        backend.write_at(5, b"xyz").unwrap();
        assert_eq!(backend.size().unwrap(), 8);
        assert_eq!(backend.read_at(0, 8).unwrap(), b"abc\0\0xyz");
    }

    #[test]
    fn truncate() {
        let backend = InMemoryBackend::with_data(b"0123456789".to_vec());
        backend.truncate(3).unwrap();
        assert_eq!(backend.snapshot(), b"012");
        assert!(backend.truncate(4).is_err());
    }

    #[test]
    fn read_past_end() {
        let backend = InMemoryBackend::with_data(vec![1, 2, 3]);
        assert!(matches!(
            backend.read_at(1, 3),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }
}
