//! Ordered `i32` to value map.

use crate::tree::{Tree, TreeIter};

/// An ordered map from `i32` keys to arbitrary values, backed by the same
/// arena red-black tree as [`IntSet`](crate::IntSet).
///
/// The storage engine uses this for its size-keyed free lists (each key is
/// a block size, each value the set of free offsets of that size) and for
/// per-index code-to-ids tables.
#[derive(Debug, Clone, Default)]
pub struct IntObjectMap<V> {
    tree: Tree<V>,
}

impl<V> IntObjectMap<V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> IntObjectMap<V> {
        IntObjectMap { tree: Tree::new() }
    }

    /// Creates an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> IntObjectMap<V> {
        IntObjectMap {
            tree: Tree::with_capacity(capacity),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Maps `key` to `value`, returning the previous value if any.
    pub fn insert(&mut self, key: i32, value: V) -> Option<V> {
        self.tree.insert(key, value)
    }

    /// Borrow of the value mapped to `key`, if any.
    #[must_use]
    pub fn get(&self, key: i32) -> Option<&V> {
        self.tree.find(key).map(|s| self.tree.payload(s))
    }

    /// Mutable borrow of the value mapped to `key`, if any.
    pub fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        let slot = self.tree.find(key)?;
        Some(self.tree.payload_mut(slot))
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: i32) -> Option<V> {
        self.tree.remove(key)
    }

    /// True if `key` is mapped.
    #[must_use]
    pub fn contains_key(&self, key: i32) -> bool {
        self.tree.contains(key)
    }

    /// Largest key `<= probe`, if any.
    #[must_use]
    pub fn floor_key(&self, probe: i32) -> Option<i32> {
        self.tree.floor_slot(probe).map(|s| self.tree.key(s))
    }

    /// Smallest key `>= probe`, if any.
    #[must_use]
    pub fn ceiling_key(&self, probe: i32) -> Option<i32> {
        self.tree.ceiling_slot(probe).map(|s| self.tree.key(s))
    }

    /// Ascending iteration over `(key, &value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &V)> {
        IntObjectMapIter {
            inner: self.tree.iter(),
        }
    }

    /// The keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<i32> {
        self.iter().map(|(k, _)| k).collect()
    }
}

struct IntObjectMapIter<'a, V> {
    inner: TreeIter<'a, V>,
}

impl<'a, V> Iterator for IntObjectMapIter<'a, V> {
    type Item = (i32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut map: IntObjectMap<String> = IntObjectMap::new();
        assert!(map.insert(1, "one".into()).is_none());
        assert_eq!(map.insert(1, "uno".into()), Some("one".into()));
        assert_eq!(map.get(1).map(String::as_str), Some("uno"));
        map.get_mut(1).unwrap().push('!');
        assert_eq!(map.remove(1), Some("uno!".into()));
        assert!(map.is_empty());
    }

    #[test]
    fn ceiling_key_for_allocation() {
        // Size-indexed free lists: find the smallest size >= a request.
        let mut free: IntObjectMap<Vec<i32>> = IntObjectMap::new();
        free.insert(16, vec![100]);
        free.insert(64, vec![200, 300]);
        assert_eq!(free.ceiling_key(17), Some(64));
        assert_eq!(free.ceiling_key(16), Some(16));
        assert_eq!(free.ceiling_key(65), None);
    }

    #[test]
    fn ascending_iteration() {
        let mut map: IntObjectMap<char> = IntObjectMap::new();
        for (k, v) in [(2, 'b'), (0, 'a'), (9, 'c')] {
            map.insert(k, v);
        }
        let pairs: Vec<(i32, char)> = map.iter().map(|(k, v)| (k, *v)).collect();
        assert_eq!(pairs, vec![(0, 'a'), (2, 'b'), (9, 'c')]);
    }
}
