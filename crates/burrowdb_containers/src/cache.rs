//! Bounded cache over an [`IntObjectMap`].

use crate::int_map::IntIntMap;
use crate::object_map::IntObjectMap;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    tick: i32,
    committed: bool,
}

/// A bounded least-recently-used cache keyed by `i32`.
///
/// Callers of the storage engine use this to keep decoded records around
/// without holding every record in memory forever. Entries start out
/// *uncommitted* and must be flipped with
/// [`mark_committed`](BoundedCache::mark_committed) (or
/// [`mark_all_committed`](BoundedCache::mark_all_committed) after a store
/// commit) once their backing data is durable.
///
/// Eviction removes the least-recently-used **committed** entry. An entry
/// that is not yet committed is never evicted - it may be the only copy of
/// the data - so the cache temporarily exceeds its capacity when everything
/// in it is uncommitted.
#[derive(Debug, Clone)]
pub struct BoundedCache<V> {
    entries: IntObjectMap<CacheEntry<V>>,
    /// tick -> key, ascending tick order is recency order.
    recency: IntIntMap,
    next_tick: i32,
    capacity: usize,
}

impl<V> BoundedCache<V> {
    /// Creates a cache holding up to `capacity` committed entries.
    #[must_use]
    pub fn new(capacity: usize) -> BoundedCache<V> {
        BoundedCache {
            entries: IntObjectMap::new(),
            recency: IntIntMap::new(),
            next_tick: 0,
            capacity: capacity.max(1),
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `value` under `key` as an uncommitted entry.
    ///
    /// Returns the previously cached value, if any. May evict the
    /// least-recently-used committed entry to stay within capacity.
    pub fn insert(&mut self, key: i32, value: V) -> Option<V> {
        let tick = self.bump_tick();
        let old = self.entries.insert(
            key,
            CacheEntry {
                value,
                tick,
                committed: false,
            },
        );
        if let Some(ref old_entry) = old {
            self.recency.remove(old_entry.tick);
        }
        self.recency.insert(tick, key);
        self.evict_over_capacity();
        old.map(|e| e.value)
    }

    /// Fetches `key`, refreshing its recency.
    pub fn get(&mut self, key: i32) -> Option<&V> {
        let tick = self.bump_tick();
        let entry = self.entries.get_mut(key)?;
        let old_tick = entry.tick;
        entry.tick = tick;
        self.recency.remove(old_tick);
        self.recency.insert(tick, key);
        self.entries.get(key).map(|e| &e.value)
    }

    /// Fetches `key` without touching recency.
    #[must_use]
    pub fn peek(&self, key: i32) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// True if `key` is cached.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, returning its value if it was cached.
    pub fn remove(&mut self, key: i32) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(entry.tick);
        Some(entry.value)
    }

    /// Marks `key` as committed, making it eligible for eviction.
    ///
    /// Returns `true` if the key was cached. If the cache is over capacity
    /// from uncommitted inserts, this may evict immediately.
    pub fn mark_committed(&mut self, key: i32) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.committed = true;
                self.evict_over_capacity();
                true
            }
            None => false,
        }
    }

    /// Drops every uncommitted entry, keeping committed ones.
    ///
    /// Used when a transaction rolls back: the uncommitted values no
    /// longer match the backing data.
    pub fn drop_uncommitted(&mut self) {
        let stale: Vec<i32> = self
            .entries
            .keys()
            .into_iter()
            .filter(|&key| self.entries.get(key).is_some_and(|e| !e.committed))
            .collect();
        for key in stale {
            self.remove(key);
        }
    }

    /// Marks every entry as committed, then trims back to capacity.
    pub fn mark_all_committed(&mut self) {
        for key in self.entries.keys() {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.committed = true;
            }
        }
        self.evict_over_capacity();
    }

    fn evict_over_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self.recency.iter().find_map(|(_, key)| {
                self.entries
                    .get(key)
                    .filter(|entry| entry.committed)
                    .map(|_| key)
            });
            match victim {
                Some(key) => {
                    self.remove(key);
                }
                // Nothing evictable; carry the overflow until a commit.
                None => break,
            }
        }
    }

    fn bump_tick(&mut self) -> i32 {
        if self.next_tick == i32::MAX {
            self.renumber_ticks();
        }
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Compacts tick values back to 0..n, preserving recency order.
    fn renumber_ticks(&mut self) {
        let order: Vec<i32> = self.recency.iter().map(|(_, key)| key).collect();
        self.recency = IntIntMap::with_capacity(order.len());
        self.next_tick = 0;
        for key in order {
            let tick = self.next_tick;
            self.next_tick += 1;
            if let Some(entry) = self.entries.get_mut(key) {
                entry.tick = tick;
            }
            self.recency.insert(tick, key);
        }
    }
}
