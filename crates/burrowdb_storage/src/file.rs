//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A file-based storage backend.
///
/// Data survives process restarts. The file handle is released
/// deterministically when the backend is dropped; durability still
/// requires an explicit [`sync`](StorageBackend::sync) beforehand.
///
/// # Thread Safety
///
/// Positioned reads and writes go through an internal lock because file
/// seeks are stateful; the backend itself is `Send + Sync`.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Opens or creates a file backend, creating parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file
    /// cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let mut file = self.file.write();
        let mut size = self.size.write();

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;

        let end = offset + data.len() as u64;
        if end > *size {
            *size = end;
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        *size = new_size;
        Ok(())
    }

    fn sync(&self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let backend = FileBackend::open(&path).unwrap();

        backend.write_at(0, b"hello world").unwrap();
        assert_eq!(backend.read_at(6, 5).unwrap(), b"world");
        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn overwrite_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("data.bin")).unwrap();

        backend.write_at(0, b"aaaaaaaa").unwrap();
        backend.write_at(2, b"XY").unwrap();
        assert_eq!(backend.read_at(0, 8).unwrap(), b"aaXYaaaa");
        assert_eq!(backend.size().unwrap(), 8);
    }

    #[test]
    fn write_past_end_grows_with_zero_gap() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("data.bin")).unwrap();

        backend.write_at(4, b"zz").unwrap();
        assert_eq!(backend.size().unwrap(), 6);
        assert_eq!(backend.read_at(0, 6).unwrap(), b"\0\0\0\0zz");
    }

    #[test]
    fn read_past_end_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("data.bin")).unwrap();

        backend.write_at(0, b"abc").unwrap();
        assert!(matches!(
            backend.read_at(2, 4),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn truncate_shrinks_and_rejects_growth() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("data.bin")).unwrap();

        backend.write_at(0, b"0123456789").unwrap();
        backend.truncate(4).unwrap();
        assert_eq!(backend.size().unwrap(), 4);
        assert!(matches!(
            backend.truncate(100),
            Err(StorageError::TruncateBeyondEnd { .. })
        ));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        {
            let backend = FileBackend::open(&path).unwrap();
            backend.write_at(0, b"durable").unwrap();
            backend.sync().unwrap();
        }
        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.read_at(0, 7).unwrap(), b"durable");
    }
}
