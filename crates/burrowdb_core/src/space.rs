//! Free-space bookkeeping.

use burrowdb_containers::{IntObjectMap, IntSet};
use std::fmt::Write as _;

/// Size-keyed registry of free blocks in the store file.
///
/// Maps each block size to the set of free offsets of exactly that size.
/// Allocation asks for the smallest registered size that satisfies a
/// request (ceiling lookup); a miss means the caller allocates at
/// end-of-file. The registry has no adjacency awareness - coalescing
/// neighboring gaps is the store's job, done against the used-record
/// table's true block boundaries.
///
/// Never persisted: rebuilt at open time as the complement of the used
/// blocks over `[DATA_START, end-of-file)`.
#[derive(Debug, Clone, Default)]
pub struct FreeSpace {
    by_size: IntObjectMap<IntSet>,
}

impl FreeSpace {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> FreeSpace {
        FreeSpace {
            by_size: IntObjectMap::new(),
        }
    }

    /// True if no free blocks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_size.is_empty()
    }

    /// Registers a free block of `size` bytes at `offset`.
    ///
    /// Degenerate regions are ignored: a non-positive size, an offset
    /// inside the header, or an offset at or past `eof` (end-of-file
    /// space is implicit, not registered).
    pub fn add(&mut self, size: i32, offset: i32, eof: i32) {
        if size < 1 || offset < crate::store::DATA_START || offset > eof {
            return;
        }
        match self.by_size.get_mut(size) {
            Some(set) => {
                set.add(offset);
            }
            None => {
                let mut set = IntSet::with_capacity(1);
                set.add(offset);
                self.by_size.insert(size, set);
            }
        }
    }

    /// Unregisters the free block of `size` bytes at `offset`, if present.
    pub fn remove(&mut self, size: i32, offset: i32) {
        if let Some(set) = self.by_size.get_mut(size) {
            set.remove(offset);
            if set.is_empty() {
                self.by_size.remove(size);
            }
        }
    }

    /// True if a free block of exactly `size` bytes at `offset` is
    /// registered.
    #[must_use]
    pub fn contains(&self, size: i32, offset: i32) -> bool {
        self.by_size
            .get(size)
            .is_some_and(|set| set.contains(offset))
    }

    /// Finds a free block of at least `min_size` bytes.
    ///
    /// Returns the block's registered `(size, offset)`; the chosen size is
    /// the smallest registered size that fits. `None` means no internal
    /// block fits and the caller should allocate at end-of-file.
    #[must_use]
    pub fn find(&self, min_size: i32) -> Option<(i32, i32)> {
        let size = self.by_size.ceiling_key(min_size)?;
        let offset = self.by_size.get(size)?.first()?;
        Some((size, offset))
    }

    /// Total registered free bytes. Diagnostic only.
    #[must_use]
    pub fn total_bytes(&self) -> i64 {
        self.by_size
            .iter()
            .map(|(size, set)| i64::from(size) * set.len() as i64)
            .sum()
    }

    /// Human-readable dump of the registry, size by size.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (size, offsets) in self.by_size.iter() {
            let _ = write!(out, "{size:>7} ->");
            for offset in offsets.iter() {
                let _ = write!(out, " {offset}");
            }
            out.push('\n');
        }
        out
    }
}
