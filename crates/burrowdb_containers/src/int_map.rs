//! Ordered `i32` to `i32` map.

use crate::error::ContainerResult;
use crate::tree::{Tree, TreeCursor, TreeIter};

/// An ordered `i32` to `i32` map backed by an arena red-black tree.
///
/// The storage engine leans on this container for its offset bookkeeping:
/// offset-to-length tables and id-to-offset indices, where the floor and
/// ceiling queries find a block's true neighbors.
#[derive(Debug, Clone, Default)]
pub struct IntIntMap {
    tree: Tree<i32>,
}

impl IntIntMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> IntIntMap {
        IntIntMap { tree: Tree::new() }
    }

    /// Creates an empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> IntIntMap {
        IntIntMap {
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
    pub fn insert(&mut self, key: i32, value: i32) -> Option<i32> {
        self.tree.insert(key, value)
    }

    /// Value mapped to `key`, if any.
    #[must_use]
    pub fn get(&self, key: i32) -> Option<i32> {
        self.tree.find(key).map(|s| *self.tree.payload(s))
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: i32) -> Option<i32> {
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

    /// Largest key in the map, if any.
    #[must_use]
    pub fn max_key(&self) -> Option<i32> {
        self.floor_key(i32::MAX)
    }

    /// Ascending iteration over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        IntIntMapIter {
            inner: self.tree.iter(),
        }
    }

    /// The keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<i32> {
        self.iter().map(|(k, _)| k).collect()
    }

    /// Detached fail-fast cursor over the entries.
    #[must_use]
    pub fn cursor(&self) -> IntIntMapCursor {
        IntIntMapCursor {
            inner: TreeCursor::new(&self.tree),
        }
    }
}

impl PartialEq for IntIntMap {
    fn eq(&self, other: &IntIntMap) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for IntIntMap {}

impl FromIterator<(i32, i32)> for IntIntMap {
    fn from_iter<T: IntoIterator<Item = (i32, i32)>>(iter: T) -> IntIntMap {
        let mut map = IntIntMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

struct IntIntMapIter<'a> {
    inner: TreeIter<'a, i32>,
}

impl Iterator for IntIntMapIter<'_> {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        self.inner.next().map(|(k, v)| (k, *v))
    }
}

/// A detached fail-fast cursor over an [`IntIntMap`].
#[derive(Debug, Clone)]
pub struct IntIntMapCursor {
    inner: TreeCursor,
}

impl IntIntMapCursor {
    /// Next `(key, value)` pair in ascending key order.
    pub fn next(&mut self, map: &IntIntMap) -> ContainerResult<Option<(i32, i32)>> {
        Ok(self.inner.next(&map.tree)?.map(|(k, v)| (k, *v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerError;
    use proptest::prelude::*;

    #[test]
    fn insert_get_remove() {
        let mut map = IntIntMap::new();
        assert_eq!(map.insert(8, 100), None);
        assert_eq!(map.insert(8, 200), Some(100));
        assert_eq!(map.get(8), Some(200));
        assert_eq!(map.remove(8), Some(200));
        assert_eq!(map.get(8), None);
    }

    #[test]
    fn floor_and_ceiling_keys() {
        let map: IntIntMap = [(8, 20), (28, 64), (100, 12)].into_iter().collect();
        assert_eq!(map.ceiling_key(9), Some(28));
        assert_eq!(map.ceiling_key(101), None);
        assert_eq!(map.floor_key(27), Some(8));
        assert_eq!(map.floor_key(7), None);
        assert_eq!(map.max_key(), Some(100));
    }

    #[test]
    fn ascending_pairs() {
        let map: IntIntMap = [(3, 30), (1, 10), (2, 20)].into_iter().collect();
        let pairs: Vec<(i32, i32)> = map.iter().collect();
        assert_eq!(pairs, vec![(1, 10), (2, 20), (3, 30)]);
        assert_eq!(map.keys(), vec![1, 2, 3]);
    }

    #[test]
    fn cursor_detects_modification() {
        let mut map: IntIntMap = [(1, 1), (2, 2)].into_iter().collect();
        let mut cursor = map.cursor();
        assert_eq!(cursor.next(&map).unwrap(), Some((1, 1)));
        map.insert(9, 9);
        assert_eq!(
            cursor.next(&map),
            Err(ContainerError::ConcurrentModification)
        );
    }

    #[test]
    fn value_overwrite_does_not_trip_cursor() {
        let mut map: IntIntMap = [(1, 1), (2, 2)].into_iter().collect();
        let mut cursor = map.cursor();
        assert_eq!(cursor.next(&map).unwrap(), Some((1, 1)));
        map.insert(2, 20);
        assert_eq!(cursor.next(&map).unwrap(), Some((2, 20)));
    }

    proptest! {
        /// Randomized insert/remove sequences agree with a model BTreeMap.
        #[test]
        fn behaves_like_model(ops in prop::collection::vec((any::<i16>(), any::<Option<i16>>()), 1..400)) {
            let mut map = IntIntMap::new();
            let mut model = std::collections::BTreeMap::new();
            for (raw, op) in ops {
                let key = i32::from(raw);
                match op {
                    Some(v) => {
                        prop_assert_eq!(map.insert(key, i32::from(v)), model.insert(key, i32::from(v)));
                    }
                    None => {
                        prop_assert_eq!(map.remove(key), model.remove(&key));
                    }
                }
                prop_assert_eq!(map.len(), model.len());
            }
            let collected: Vec<(i32, i32)> = map.iter().collect();
            let expected: Vec<(i32, i32)> = model.iter().map(|(&k, &v)| (k, v)).collect();
            prop_assert_eq!(collected, expected);
        }
    }
}
