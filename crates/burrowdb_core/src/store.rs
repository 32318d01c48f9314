//! The persistent store.

use crate::codec::{put_i32, ByteReader};
use crate::error::{CoreError, CoreResult};
use crate::index_block::IndexBlock;
use crate::record::{Record, RecordIndex};
use crate::space::FreeSpace;
use burrowdb_containers::{IntIntMap, IntSet};
use burrowdb_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;
use tracing::{debug, trace};

/// First byte available for blocks; the 8-byte header precedes it.
pub(crate) const DATA_START: i32 = 8;

/// An embedded, single-file, variable-length record store with pluggable
/// secondary indexing, in-place free-space reuse and explicit
/// commit/rollback.
///
/// The file is an 8-byte header (index block offset and capacity, both
/// big-endian `i32`) followed by length-prefixed blocks. One block is the
/// index block - the persisted id-to-offset map plus one secondary index
/// per functor registered at open time. Everything else (used-block
/// table, free lists) is derived at open and never persisted.
///
/// # Transactions
///
/// `store` and `delete` mutate in-memory state and file data blocks but
/// not the header; they leave the store *dirty*. `commit` serializes the
/// index block and re-points the header as its final write - the single
/// atomic step a crash is measured against: a reopen either sees the old
/// index block (uncommitted work lost, equivalent to rollback) or the
/// complete new one. `rollback` discards dirty state by re-cloning the
/// committed snapshots, with no file I/O.
///
/// Three parallel views back this: the live view (in-progress state), the
/// *usable* view (committed state plus space already promised during this
/// transaction, consulted for allocation so one transaction never hands
/// out the same bytes twice) and the *committed* view (restored verbatim
/// on rollback). Space freed by an uncommitted delete enters only the
/// live view: it must not be reused before commit, because rollback has
/// to find the old bytes intact.
///
/// # Concurrency
///
/// Single-actor and blocking throughout. The store does no internal
/// locking; callers serialize access to one instance.
pub struct PersistentStore<R: Record, B: StorageBackend = FileBackend> {
    backend: B,
    functors: Vec<Box<dyn RecordIndex<R>>>,
    /// Prototype record, reused as a decode scratch buffer when deriving
    /// index codes from stored bytes.
    scratch: R,
    index: IndexBlock,
    committed_index: IndexBlock,
    /// offset -> length of live blocks, index block included.
    used: IntIntMap,
    usable_used: IntIntMap,
    committed_used: IntIntMap,
    free: FreeSpace,
    usable_free: FreeSpace,
    committed_free: FreeSpace,
    dirty: bool,
}

impl<R: Record> PersistentStore<R, FileBackend> {
    /// Opens (or initializes) a store file.
    ///
    /// `functors` define the secondary indices, matched positionally
    /// against the indices persisted in the file; `prototype` supplies a
    /// scratch record for deriving codes from stored bytes.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a corrupt index block; a stored index count
    /// different from `functors.len()` is corruption.
    pub fn open(
        path: &Path,
        functors: Vec<Box<dyn RecordIndex<R>>>,
        prototype: R,
    ) -> CoreResult<Self> {
        let backend = FileBackend::open(path)?;
        Self::with_backend(backend, functors, prototype)
    }
}

impl<R: Record> PersistentStore<R, InMemoryBackend> {
    /// Opens a volatile in-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Fails only if the preloaded backend content is corrupt.
    pub fn open_in_memory(
        functors: Vec<Box<dyn RecordIndex<R>>>,
        prototype: R,
    ) -> CoreResult<Self> {
        Self::with_backend(InMemoryBackend::new(), functors, prototype)
    }
}

impl<R: Record, B: StorageBackend> PersistentStore<R, B> {
    /// Opens a store over an arbitrary backend.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a corrupt index block.
    pub fn with_backend(
        backend: B,
        functors: Vec<Box<dyn RecordIndex<R>>>,
        prototype: R,
    ) -> CoreResult<Self> {
        if backend.size()? < DATA_START as u64 {
            // Fresh file: zero header, no index block yet.
            backend.write_at(0, &[0u8; 8])?;
        }

        let mut store = PersistentStore {
            backend,
            functors,
            scratch: prototype,
            index: IndexBlock::new(0),
            committed_index: IndexBlock::new(0),
            used: IntIntMap::new(),
            usable_used: IntIntMap::new(),
            committed_used: IntIntMap::new(),
            free: FreeSpace::new(),
            usable_free: FreeSpace::new(),
            committed_free: FreeSpace::new(),
            dirty: false,
        };
        store.rebuild_from_header()?;
        debug!(
            ids = store.index.id_count(),
            file_len = store.eof()?,
            "opened store"
        );
        Ok(store)
    }

    /// Reads the header, decodes the index block and derives the used and
    /// free tables, then snapshots the committed/usable views.
    fn rebuild_from_header(&mut self) -> CoreResult<()> {
        let (ib_offset, ib_capacity) = self.read_header()?;

        self.index = if ib_offset != 0 {
            let bytes = self.read_block(ib_offset)?;
            IndexBlock::decode(&bytes, self.functors.len())?
        } else {
            IndexBlock::new(self.functors.len())
        };

        // Used table: every record's on-disk length prefix is trusted.
        self.used = IntIntMap::with_capacity(self.index.id_count());
        let offsets: Vec<i32> = self.index.id_offsets().map(|(_, off)| off).collect();
        for offset in offsets {
            let length = self.read_length_prefix(offset)?;
            self.used.insert(offset, length);
        }
        if ib_offset != 0 && ib_capacity != 0 {
            self.used.insert(ib_offset, ib_capacity);
        }

        // Free space is the complement of the used table over the data
        // region; used blocks + gaps + index block tile the file exactly.
        let eof = self.eof()?;
        self.free = FreeSpace::new();
        let mut current = DATA_START;
        for (offset, length) in self.used.iter() {
            if current < offset {
                self.free.add(offset - current, current, eof);
            }
            current = offset + length;
        }
        if current < eof {
            self.free.add(eof - current, current, eof);
        }

        self.committed_index = self.index.clone();
        self.committed_used = self.used.clone();
        self.usable_used = self.used.clone();
        self.committed_free = self.free.clone();
        self.usable_free = self.free.clone();
        self.dirty = false;
        Ok(())
    }

    /// Stores `record`, replacing any existing record with the same id.
    ///
    /// There is no update in place: a live id is deleted first, its index
    /// entries and space reclaimed, then the new version is written to a
    /// freshly allocated block. The store becomes dirty; `commit` makes
    /// the change durable.
    ///
    /// # Errors
    ///
    /// [`CoreError::RecordLengthMismatch`] if the record encodes a
    /// different number of bytes than `streamed_len()` declared - fatal,
    /// the record contract is broken. I/O errors propagate.
    pub fn store(&mut self, record: &R) -> CoreResult<()> {
        let id = record.id();
        if self.index.contains(id) {
            self.delete(id)?;
        }

        let declared = record.streamed_len();
        let mut bytes = Vec::with_capacity(declared);
        record.encode(&mut bytes);
        if bytes.len() != declared {
            return Err(CoreError::RecordLengthMismatch {
                id,
                declared,
                actual: bytes.len(),
            });
        }
        let length = declared as i32;

        // Allocate from the usable view so space freed by uncommitted
        // deletes is never handed out, then carve the chosen gap out of
        // both views.
        let eof = self.eof()?;
        let location = match self.usable_free.find(length) {
            Some((_, offset)) => offset,
            None => eof,
        };
        carve_gap(&mut self.usable_free, &self.usable_used, location, length, eof);
        carve_gap(&mut self.free, &self.used, location, length, eof);

        self.backend.write_at(location as u64, &bytes)?;
        self.used.insert(location, length);
        self.usable_used.insert(location, length);

        let codes = self.codes_from_bytes(&bytes)?;
        self.index.put(id, location, &codes);
        self.dirty = true;
        trace!(id, location, length, "stored record");
        Ok(())
    }

    /// Deletes the record with `id`.
    ///
    /// Deleting an unknown or out-of-range id is a silent no-op, not an
    /// error. The freed gap is coalesced with its true neighbors (found
    /// through the used table's floor/ceiling, not just adjacent free
    /// blocks) into the live free view only; the space becomes reusable
    /// after the next commit.
    ///
    /// # Errors
    ///
    /// I/O errors from re-reading the record to derive its index codes.
    pub fn delete(&mut self, id: i32) -> CoreResult<()> {
        let eof = self.eof()?;
        let Some(location) = self.index.offset_of(id) else {
            return Ok(());
        };
        if location < DATA_START || location >= eof {
            return Ok(());
        }
        // Codes must come from the still-live bytes; after the unmap
        // there is nothing to derive them from.
        let codes = self.codes_at(location)?;
        let Some(size) = self.used.get(location) else {
            self.index.remove(id, &codes);
            self.dirty = true;
            return Ok(());
        };
        self.used.remove(location);
        self.release_region(location, size, eof);
        self.index.remove(id, &codes);
        self.dirty = true;
        trace!(id, location, size, "deleted record");
        Ok(())
    }

    /// Loads the record with `id` into `record`.
    ///
    /// An unknown or out-of-range id leaves `record` untouched; callers
    /// pre-set a sentinel id and compare afterward to detect the miss.
    ///
    /// # Errors
    ///
    /// I/O or decode errors propagate.
    pub fn load(&self, id: i32, record: &mut R) -> CoreResult<()> {
        let eof = self.eof()?;
        let Some(location) = self.index.offset_of(id) else {
            return Ok(());
        };
        if location < DATA_START || location >= eof {
            return Ok(());
        }
        let bytes = self.read_block(location)?;
        let mut reader = ByteReader::new(&bytes);
        record.decode(&mut reader)?;
        Ok(())
    }

    /// Reloads `record` from the store by its own id.
    ///
    /// # Errors
    ///
    /// Same as [`load`](PersistentStore::load).
    pub fn reload(&self, record: &mut R) -> CoreResult<()> {
        let id = record.id();
        self.load(id, record)
    }

    /// All live ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<i32> {
        self.index.id_list()
    }

    /// Ids matching every one of the `(code, functor)` pairs, matched
    /// positionally against the registered functors.
    #[must_use]
    pub fn ids_matching(&self, codes: &[i32]) -> Vec<i32> {
        let mask = vec![true; codes.len()];
        self.ids_matching_masked(codes, &mask)
    }

    /// Ids matching the selected `(code, functor)` pairs.
    ///
    /// `codes[i]` is queried against secondary index `i` when `mask[i]`
    /// is true. A mask length different from the registered functor
    /// count, an empty selection, or any empty operand set short-circuits
    /// to an empty result. With three or more operands the intersection
    /// runs smallest-set-first through a size-ordered priority queue.
    #[must_use]
    pub fn ids_matching_masked(&self, codes: &[i32], mask: &[bool]) -> Vec<i32> {
        if mask.len() != self.index.index_count() || codes.len() != mask.len() {
            return Vec::new();
        }
        let mut sets: Vec<IntSet> = Vec::new();
        for (index_no, (&code, &selected)) in codes.iter().zip(mask).enumerate() {
            if !selected {
                continue;
            }
            let set = self.index.ids_for(code, index_no);
            if set.is_empty() {
                return Vec::new();
            }
            sets.push(set);
        }
        match sets.len() {
            0 => Vec::new(),
            1 => sets.remove(0).to_vec(),
            2 => sets[0].intersection(&sets[1]).to_vec(),
            _ => {
                let mut heap: BinaryHeap<Reverse<BySize>> =
                    sets.into_iter().map(|s| Reverse(BySize(s))).collect();
                let Some(Reverse(BySize(mut acc))) = heap.pop() else {
                    return Vec::new();
                };
                while !acc.is_empty() {
                    match heap.pop() {
                        Some(Reverse(BySize(next))) => acc = acc.intersection(&next),
                        None => break,
                    }
                }
                acc.to_vec()
            }
        }
    }

    /// Largest id currently present; seeds a caller's own next-id
    /// counter. The store never invents ids.
    #[must_use]
    pub fn max_id(&self) -> Option<i32> {
        self.index.max_id()
    }

    /// Number of live records.
    #[must_use]
    pub fn id_count(&self) -> usize {
        self.index.id_count()
    }

    /// True if there are uncommitted changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Commits pending changes: serializes the index block to a freshly
    /// allocated region, then re-points the header.
    ///
    /// The header write is the final step and the crash-recoverability
    /// boundary - before it, a reopen sees the previous commit; after it,
    /// the new one. The index block's region is rounded up to the next
    /// power of two so it can grow a little in place. After the header
    /// write, if the gap right behind the header fits the block, it is
    /// opportunistically rewritten there to keep hot metadata at a stable
    /// low offset. A no-op when nothing is dirty.
    ///
    /// # Errors
    ///
    /// I/O errors propagate; the in-memory state may then be ahead of the
    /// committed snapshots and callers should roll back.
    pub fn commit(&mut self) -> CoreResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let (old_location, old_capacity) = self.read_header()?;

        let block = self.index.encode();
        let length = block.len() as i32;
        let mut capacity = 1i32;
        while capacity <= length {
            capacity <<= 1;
        }

        let eof = self.eof()?;
        let location = match self.usable_free.find(capacity) {
            Some((_, offset)) => offset,
            None => eof,
        };
        carve_gap(&mut self.free, &self.used, location, capacity, eof);
        self.backend.write_at(location as u64, &block)?;
        self.used.insert(location, capacity);

        // The point of no return: one 8-byte header write.
        self.write_header(location, capacity)?;

        // Retire the old index block's region into the free list.
        self.used.remove(old_location);
        let eof = self.eof()?;
        self.release_region(old_location, old_capacity, eof);

        // Copy the index block to the start of the file when the gap
        // there can take it.
        let first_used = self.used.ceiling_key(DATA_START).unwrap_or(eof);
        let start_gap = first_used - DATA_START;
        if start_gap >= capacity {
            self.free.remove(start_gap, DATA_START);
            self.free.add(start_gap - capacity, DATA_START + capacity, eof);
            self.used.insert(DATA_START, capacity);
            self.backend.write_at(DATA_START as u64, &block)?;
            self.write_header(DATA_START, capacity)?;
            self.used.remove(location);
            let eof = self.eof()?;
            // The start gap's remainder was entered above; releasing the
            // vacated region coalesces with it when the two are adjacent.
            self.release_region(location, capacity, eof);
        }

        self.committed_index = self.index.clone();
        self.committed_used = self.used.clone();
        self.usable_used = self.used.clone();
        self.committed_free = self.free.clone();
        self.usable_free = self.free.clone();
        self.dirty = false;
        debug!(length, capacity, "committed index block");
        Ok(())
    }

    /// Discards uncommitted changes by restoring the committed snapshots.
    /// Performs no file I/O. A no-op when nothing is dirty.
    pub fn rollback(&mut self) {
        if !self.dirty {
            return;
        }
        self.index = self.committed_index.clone();
        self.used = self.committed_used.clone();
        self.usable_used = self.committed_used.clone();
        self.free = self.committed_free.clone();
        self.usable_free = self.committed_free.clone();
        self.dirty = false;
        debug!("rolled back to committed state");
    }

    /// Packs the file: commits, then eliminates every free gap.
    ///
    /// The index block is relocated to the lowest slot behind the header,
    /// every live record slides leftward into the gaps (each relocated
    /// id's offset is patched inside the on-disk index block as it
    /// moves), and the file is truncated to the new high-water mark.
    /// Afterward the file length is exactly
    /// `8 + index capacity + sum of live record lengths`.
    ///
    /// Never runs implicitly; good to call after making many changes.
    ///
    /// # Errors
    ///
    /// I/O errors propagate.
    pub fn pack(&mut self) -> CoreResult<()> {
        self.commit()?;
        let (mut ib_location, ib_capacity) = self.read_header()?;
        if ib_location == 0 {
            // Nothing was ever committed; just drop any stray bytes.
            self.backend.truncate(DATA_START as u64)?;
            self.backend.sync()?;
            self.reset_space_after_pack();
            return Ok(());
        }

        // From here on the software index is ignored and offsets are
        // patched directly in the on-disk index block, through a map from
        // block location to the offset field's position inside the block.
        let mut field_positions = IntIntMap::with_capacity(self.index.id_count());
        for (rank, (_, location)) in self.index.id_offsets().enumerate() {
            field_positions.insert(location, IndexBlock::offset_field_position(rank) as i32);
        }

        // Phase 1: clear the region behind the header and move the index
        // block there. Anything in the way is evacuated to end-of-file.
        if ib_location != DATA_START {
            loop {
                let Some(next_location) = self.used.ceiling_key(DATA_START) else {
                    break;
                };
                if next_location >= DATA_START + ib_capacity {
                    break;
                }
                let new_location = self.eof()?;
                let size = self
                    .used
                    .get(next_location)
                    .ok_or_else(|| CoreError::corrupt_index("used table out of sync"))?;
                self.copy_bytes(next_location, new_location, size)?;
                if next_location == ib_location {
                    self.write_header(new_location, ib_capacity)?;
                    ib_location = new_location;
                } else {
                    self.patch_offset_field(
                        ib_location,
                        &mut field_positions,
                        next_location,
                        new_location,
                    )?;
                }
                self.used.remove(next_location);
                self.used.insert(new_location, size);
            }
            self.copy_bytes(ib_location, DATA_START, ib_capacity)?;
            self.write_header(DATA_START, ib_capacity)?;
            self.used.remove(ib_location);
            self.used.insert(DATA_START, ib_capacity);
            ib_location = DATA_START;
        }

        // Phase 2: slide every live record left into the lowest gap. A
        // record too large for the gap in front of it is parked at
        // end-of-file and picked up again once the gap has grown past it.
        let mut next_space = DATA_START + ib_capacity;
        while let Some(next_location) = self.used.ceiling_key(next_space) {
            let size = self
                .used
                .get(next_location)
                .ok_or_else(|| CoreError::corrupt_index("used table out of sync"))?;
            if next_location == next_space {
                next_space = next_location + size;
            } else if size <= next_location - next_space {
                self.copy_bytes(next_location, next_space, size)?;
                self.patch_offset_field(
                    ib_location,
                    &mut field_positions,
                    next_location,
                    next_space,
                )?;
                self.used.remove(next_location);
                self.used.insert(next_space, size);
                next_space += size;
            } else {
                let new_location = self.eof()?;
                self.copy_bytes(next_location, new_location, size)?;
                self.patch_offset_field(
                    ib_location,
                    &mut field_positions,
                    next_location,
                    new_location,
                )?;
                self.used.remove(next_location);
                self.used.insert(new_location, size);
            }
        }

        // Memory must match the patched disk state: re-read the block.
        let bytes = self.read_block(DATA_START)?;
        self.index = IndexBlock::decode(&bytes, self.functors.len())?;
        // The index block's capacity region may overhang the file end
        // when the store holds no records; never extend the file here.
        if (next_space as u64) < self.backend.size()? {
            self.backend.truncate(next_space as u64)?;
        }
        self.backend.sync()?;
        self.reset_space_after_pack();
        debug!(file_len = next_space, "packed store");
        Ok(())
    }

    /// Commits, then forces a durable sync of the file.
    ///
    /// # Errors
    ///
    /// I/O errors propagate.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.commit()?;
        self.backend.sync()?;
        Ok(())
    }

    /// Releases the store.
    ///
    /// Uncommitted changes are lost, matching rollback semantics. Call
    /// [`flush`](PersistentStore::flush) first if durability is wanted.
    /// Consuming `self` makes use-after-close unrepresentable.
    pub fn close(self) {
        drop(self);
    }

    /// Human-readable dump of the index, used table and free lists.
    #[must_use]
    pub fn debug_report(&self) -> String {
        use std::fmt::Write as _;
        let mut out = String::from("store report\n");
        out.push_str("index block:\n");
        out.push_str(&self.index.report());
        out.push_str("used (offset -> length):\n");
        for (offset, length) in self.used.iter() {
            let _ = writeln!(out, "{offset:>8} -> {length:>8}");
        }
        out.push_str("free:\n");
        out.push_str(&self.free.report());
        out.push_str("usable free:\n");
        out.push_str(&self.usable_free.report());
        out
    }

    // ---- internals -------------------------------------------------

    fn eof(&self) -> CoreResult<i32> {
        Ok(self.backend.size()? as i32)
    }

    fn read_header(&self) -> CoreResult<(i32, i32)> {
        let bytes = self.backend.read_at(0, 8)?;
        let mut reader = ByteReader::new(&bytes);
        let offset = reader.read_i32()?;
        let capacity = reader.read_i32()?;
        Ok((offset, capacity))
    }

    /// Writes the header as a single 8-byte write; this is the only
    /// atomicity the format relies on.
    fn write_header(&self, offset: i32, capacity: i32) -> CoreResult<()> {
        let mut bytes = Vec::with_capacity(8);
        put_i32(&mut bytes, offset);
        put_i32(&mut bytes, capacity);
        self.backend.write_at(0, &bytes)?;
        Ok(())
    }

    /// Reads a block's 4-byte length prefix.
    fn read_length_prefix(&self, offset: i32) -> CoreResult<i32> {
        let bytes = self.backend.read_at(offset as u64, 4).map_err(|e| match e {
            StorageError::ReadPastEnd { .. } => {
                CoreError::corrupt_index(format!("block offset {offset} is outside the file"))
            }
            other => other.into(),
        })?;
        let mut reader = ByteReader::new(&bytes);
        Ok(reader.read_i32()?)
    }

    /// Reads a complete length-prefixed block starting at `offset`.
    fn read_block(&self, offset: i32) -> CoreResult<Vec<u8>> {
        let length = self.read_length_prefix(offset)?;
        if length < 4 {
            return Err(CoreError::corrupt_index(format!(
                "block at {offset} declares invalid length {length}"
            )));
        }
        Ok(self.backend.read_at(offset as u64, length as usize)?)
    }

    /// Copies a block's bytes. The length is clamped to the bytes the
    /// file actually holds: an index block's capacity region may overhang
    /// end-of-file, and the overhang carries no data.
    fn copy_bytes(&self, from: i32, to: i32, length: i32) -> CoreResult<()> {
        let eof = self.eof()?;
        let available = length.min(eof - from);
        if available <= 0 {
            return Ok(());
        }
        let bytes = self.backend.read_at(from as u64, available as usize)?;
        self.backend.write_at(to as u64, &bytes)?;
        Ok(())
    }

    /// Derives the index codes from encoded record bytes by decoding into
    /// the scratch record. Codes are always computed on *decoded* state,
    /// both here and at delete time, so a lossy encoding cannot make the
    /// two derivations disagree.
    fn codes_from_bytes(&mut self, bytes: &[u8]) -> CoreResult<Vec<i32>> {
        if self.functors.is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = ByteReader::new(bytes);
        self.scratch.decode(&mut reader)?;
        let scratch = &self.scratch;
        Ok(self.functors.iter().map(|f| f.code(scratch)).collect())
    }

    /// Derives the index codes of the record stored at `offset`. Reads
    /// the file only when at least one functor is registered.
    fn codes_at(&mut self, offset: i32) -> CoreResult<Vec<i32>> {
        if self.functors.is_empty() {
            return Ok(Vec::new());
        }
        let bytes = self.read_block(offset)?;
        self.codes_from_bytes(&bytes)
    }

    /// Returns `[location, location + size)` to the live free view,
    /// merging with the true neighboring gaps. The block must already be
    /// out of the used table; neighbors come from the used table's
    /// floor/ceiling, snapping to `DATA_START` and end-of-file.
    ///
    /// The ceiling is taken at `location`, not `location + size`: an
    /// index block's capacity region can overhang end-of-file, and a
    /// block allocated from end-of-file then sits inside it. Searching
    /// from `location` finds that intruder and keeps it out of the
    /// released gap.
    fn release_region(&mut self, location: i32, size: i32, eof: i32) {
        let ceiling = self.used.ceiling_key(location).unwrap_or(eof);
        let floor_end = match self.used.floor_key(location - 1) {
            Some(floor) => floor + self.used.get(floor).unwrap_or(0),
            None => DATA_START,
        };
        if ceiling != location + size {
            self.free.remove(ceiling - (location + size), location + size);
        }
        if floor_end != location {
            self.free.remove(location - floor_end, floor_end);
        }
        self.free.add(ceiling - floor_end, floor_end, eof);
    }

    /// Patches an id's offset field inside the on-disk index block after
    /// its record moved from `old_location` to `new_location`.
    fn patch_offset_field(
        &self,
        block_location: i32,
        field_positions: &mut IntIntMap,
        old_location: i32,
        new_location: i32,
    ) -> CoreResult<()> {
        let position = field_positions
            .remove(old_location)
            .ok_or_else(|| CoreError::corrupt_index("moved block is not in the index"))?;
        let mut bytes = Vec::with_capacity(4);
        put_i32(&mut bytes, new_location);
        self.backend
            .write_at((block_location + position) as u64, &bytes)?;
        field_positions.insert(new_location, position);
        Ok(())
    }

    /// After a pack the file has no gaps: empty free lists all around,
    /// snapshots refreshed.
    fn reset_space_after_pack(&mut self) {
        self.free = FreeSpace::new();
        self.usable_free = FreeSpace::new();
        self.committed_free = FreeSpace::new();
        self.usable_used = self.used.clone();
        self.committed_used = self.used.clone();
        self.committed_index = self.index.clone();
        self.dirty = false;
    }
}

/// Carves `length` bytes at `location` out of the gap containing it in
/// one view's free list. The containing gap is found through that view's
/// used table (which must not yet contain the new block); the left and
/// right remainders are re-registered.
fn carve_gap(free: &mut FreeSpace, used: &IntIntMap, location: i32, length: i32, eof: i32) {
    let gap_start = match used.floor_key(location) {
        Some(floor) => {
            let end = floor + used.get(floor).unwrap_or(0);
            end.max(DATA_START)
        }
        None => DATA_START,
    };
    let gap_end = used.ceiling_key(location).unwrap_or(eof);
    free.remove(gap_end - gap_start, gap_start);
    free.add(location - gap_start, gap_start, eof);
    free.add(gap_end - (location + length), location + length, eof);
}

/// Min-heap adapter ordering id sets by size for intersection queries.
struct BySize(IntSet);

impl PartialEq for BySize {
    fn eq(&self, other: &BySize) -> bool {
        self.0.len() == other.0.len()
    }
}

impl Eq for BySize {}

impl PartialOrd for BySize {
    fn partial_cmp(&self, other: &BySize) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BySize {
    fn cmp(&self, other: &BySize) -> std::cmp::Ordering {
        self.0.len().cmp(&other.0.len())
    }
}
