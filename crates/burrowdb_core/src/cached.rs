//! A caching layer over the store.

use crate::error::CoreResult;
use crate::record::{Record, RecordIndex};
use crate::store::PersistentStore;
use burrowdb_containers::BoundedCache;
use burrowdb_storage::{FileBackend, StorageBackend};
use std::path::Path;

/// A [`PersistentStore`] with a bounded cache of decoded records.
///
/// Reads are served from the cache when possible; writes go through to
/// the store immediately and the written record is cached. Cached
/// entries written since the last commit are pinned: the cache may not
/// evict them, so it can temporarily exceed its capacity during a large
/// transaction. `commit` unpins everything and trims back to capacity;
/// `rollback` drops the unpinned-to-be entries, whose values no longer
/// match the store.
///
/// Misses are detected by the store's sentinel convention: a fresh
/// prototype clone is loaded into, and an unchanged id means the record
/// does not exist.
pub struct CachedStore<R: Record + Clone, B: StorageBackend = FileBackend> {
    store: PersistentStore<R, B>,
    cache: BoundedCache<R>,
    /// Clone source for cache-miss loads; its id is the miss sentinel.
    prototype: R,
}

impl<R: Record + Clone> CachedStore<R, FileBackend> {
    /// Opens a store file and wraps it in a cache of `capacity` records.
    ///
    /// The prototype's id (conventionally `-1`) must never be used as a
    /// live record id.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentStore::open`].
    pub fn open(
        path: &Path,
        functors: Vec<Box<dyn RecordIndex<R>>>,
        prototype: R,
        capacity: usize,
    ) -> CoreResult<Self> {
        let store = PersistentStore::open(path, functors, prototype.clone())?;
        Ok(Self::with_store(store, prototype, capacity))
    }
}

impl<R: Record + Clone, B: StorageBackend> CachedStore<R, B> {
    /// Wraps an already-open store.
    pub fn with_store(store: PersistentStore<R, B>, prototype: R, capacity: usize) -> Self {
        CachedStore {
            store,
            cache: BoundedCache::new(capacity),
            prototype,
        }
    }

    /// Fetches the record with `id`, from cache or store.
    ///
    /// # Errors
    ///
    /// I/O or decode errors from a cache-miss load.
    pub fn get(&mut self, id: i32) -> CoreResult<Option<R>> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(Some(hit.clone()));
        }
        let mut record = self.prototype.clone();
        self.store.load(id, &mut record)?;
        if record.id() != id {
            return Ok(None);
        }
        // A miss means the record was not written this transaction
        // (those stay pinned in the cache), so the loaded bytes are
        // committed data and the entry is immediately evictable.
        self.cache.insert(id, record.clone());
        self.cache.mark_committed(id);
        Ok(Some(record))
    }

    /// Stores `record` write-through and caches it.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentStore::store`].
    pub fn store(&mut self, record: &R) -> CoreResult<()> {
        self.store.store(record)?;
        self.cache.insert(record.id(), record.clone());
        Ok(())
    }

    /// Deletes the record with `id` from store and cache.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentStore::delete`].
    pub fn delete(&mut self, id: i32) -> CoreResult<()> {
        self.cache.remove(id);
        self.store.delete(id)
    }

    /// Commits the store and unpins all cached entries.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentStore::commit`].
    pub fn commit(&mut self) -> CoreResult<()> {
        self.store.commit()?;
        self.cache.mark_all_committed();
        Ok(())
    }

    /// Rolls back the store and drops cached entries written since the
    /// last commit.
    pub fn rollback(&mut self) {
        self.store.rollback();
        self.cache.drop_uncommitted();
    }

    /// Commits and syncs the store.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentStore::flush`].
    pub fn flush(&mut self) -> CoreResult<()> {
        self.store.flush()?;
        self.cache.mark_all_committed();
        Ok(())
    }

    /// Packs the store. The cache stays valid: packing moves bytes, not
    /// record contents.
    ///
    /// # Errors
    ///
    /// Same as [`PersistentStore::pack`].
    pub fn pack(&mut self) -> CoreResult<()> {
        self.store.pack()?;
        self.cache.mark_all_committed();
        Ok(())
    }

    /// All live ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<i32> {
        self.store.ids()
    }

    /// See [`PersistentStore::ids_matching`].
    #[must_use]
    pub fn ids_matching(&self, codes: &[i32]) -> Vec<i32> {
        self.store.ids_matching(codes)
    }

    /// See [`PersistentStore::ids_matching_masked`].
    #[must_use]
    pub fn ids_matching_masked(&self, codes: &[i32], mask: &[bool]) -> Vec<i32> {
        self.store.ids_matching_masked(codes, mask)
    }

    /// Largest id currently present.
    #[must_use]
    pub fn max_id(&self) -> Option<i32> {
        self.store.max_id()
    }

    /// Number of live records.
    #[must_use]
    pub fn id_count(&self) -> usize {
        self.store.id_count()
    }

    /// True if there are uncommitted changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// The underlying store.
    #[must_use]
    pub fn store_ref(&self) -> &PersistentStore<R, B> {
        &self.store
    }

    /// Unwraps the cache, returning the store.
    #[must_use]
    pub fn into_store(self) -> PersistentStore<R, B> {
        self.store
    }

    /// Releases the store; uncommitted changes are lost.
    pub fn close(self) {
        self.store.close();
    }
}
