//! Ordered set of `i32` values.

use crate::error::ContainerResult;
use crate::tree::{Tree, TreeCursor, TreeIter};

/// An ordered set of `i32` values backed by an arena red-black tree.
///
/// Insert, remove, membership and floor/ceiling queries complete in
/// O(log n). Iteration is ascending. The backing arena stays dense under
/// removal, so a set that shrinks does not strand memory.
///
/// # Example
///
/// ```
/// use burrowdb_containers::IntSet;
///
/// let mut set = IntSet::new();
/// set.add(30);
/// set.add(10);
/// set.add(20);
/// assert_eq!(set.ceiling(15), Some(20));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![10, 20, 30]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IntSet {
    tree: Tree<()>,
}

impl IntSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> IntSet {
        IntSet { tree: Tree::new() }
    }

    /// Creates an empty set with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> IntSet {
        IntSet {
            tree: Tree::with_capacity(capacity),
        }
    }

    /// Number of values in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True if the set holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Adds `value`. Returns `true` if it was not already present.
    pub fn add(&mut self, value: i32) -> bool {
        self.tree.insert(value, ()).is_none()
    }

    /// Removes `value`. Returns `true` if it was present.
    pub fn remove(&mut self, value: i32) -> bool {
        self.tree.remove(value).is_some()
    }

    /// True if `value` is in the set.
    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        self.tree.contains(value)
    }

    /// Largest value `<= probe`, if any.
    #[must_use]
    pub fn floor(&self, probe: i32) -> Option<i32> {
        self.tree.floor_slot(probe).map(|s| self.tree.key(s))
    }

    /// Smallest value `>= probe`, if any.
    #[must_use]
    pub fn ceiling(&self, probe: i32) -> Option<i32> {
        self.tree.ceiling_slot(probe).map(|s| self.tree.key(s))
    }

    /// Smallest value in the set, if any.
    #[must_use]
    pub fn first(&self) -> Option<i32> {
        self.tree.min_slot().map(|s| self.tree.key(s))
    }

    /// Ascending iteration over the values.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        IntSetIter {
            inner: self.tree.iter(),
        }
    }

    /// The values in ascending order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }

    /// Detached fail-fast cursor over the values.
    #[must_use]
    pub fn cursor(&self) -> IntSetCursor {
        IntSetCursor {
            inner: TreeCursor::new(&self.tree),
        }
    }

    /// Intersection with `other`.
    ///
    /// The smaller set drives membership probes against the larger, so the
    /// cost is O(min(n, m) log max(n, m)). The result may be empty.
    #[must_use]
    pub fn intersection(&self, other: &IntSet) -> IntSet {
        let (small, large) = if other.len() < self.len() {
            (other, self)
        } else {
            (self, other)
        };
        let mut result = IntSet::new();
        for value in small.iter() {
            if large.contains(value) {
                result.add(value);
            }
        }
        result
    }
}

impl PartialEq for IntSet {
    fn eq(&self, other: &IntSet) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for IntSet {}

impl FromIterator<i32> for IntSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> IntSet {
        let mut set = IntSet::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

struct IntSetIter<'a> {
    inner: TreeIter<'a, ()>,
}

impl Iterator for IntSetIter<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// A detached fail-fast cursor over an [`IntSet`].
///
/// The cursor does not borrow the set; pass the set back to each
/// [`next`](IntSetCursor::next) call. If the set was structurally modified
/// since the cursor was created, the call fails with
/// [`ContainerError::ConcurrentModification`](crate::ContainerError).
#[derive(Debug, Clone)]
pub struct IntSetCursor {
    inner: TreeCursor,
}

impl IntSetCursor {
    /// Next value in ascending order, or `Ok(None)` at the end.
    pub fn next(&mut self, set: &IntSet) -> ContainerResult<Option<i32>> {
        Ok(self.inner.next(&set.tree)?.map(|(k, _)| k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerError;
    use proptest::prelude::*;

    #[test]
    fn default_matches_new() {
        assert_eq!(IntSet::default(), IntSet::new());
    }

    #[test]
    fn add_remove_contains() {
        let mut set = IntSet::new();
        assert!(set.add(5));
        assert!(!set.add(5));
        assert!(set.contains(5));
        assert!(set.remove(5));
        assert!(!set.remove(5));
        assert!(set.is_empty());
    }

    #[test]
    fn ascending_iteration() {
        let set: IntSet = [9, -3, 0, 7, 2].into_iter().collect();
        assert_eq!(set.to_vec(), vec![-3, 0, 2, 7, 9]);
    }

    #[test]
    fn intersection_smaller_drives() {
        let a: IntSet = (0..100).collect();
        let b: IntSet = [5, 50, 150].into_iter().collect();
        let both = a.intersection(&b);
        assert_eq!(both.to_vec(), vec![5, 50]);
        assert_eq!(b.intersection(&a), both);
    }

    #[test]
    fn intersection_can_be_empty() {
        let a: IntSet = [1, 2].into_iter().collect();
        let b: IntSet = [3, 4].into_iter().collect();
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn cursor_detects_modification() {
        let mut set: IntSet = [1, 2, 3].into_iter().collect();
        let mut cursor = set.cursor();
        assert_eq!(cursor.next(&set).unwrap(), Some(1));
        set.remove(3);
        assert_eq!(
            cursor.next(&set),
            Err(ContainerError::ConcurrentModification)
        );
    }

    #[test]
    fn equality_is_by_contents() {
        let a: IntSet = [3, 1, 2].into_iter().collect();
        let mut b: IntSet = [2, 3].into_iter().collect();
        assert_ne!(a, b);
        b.add(1);
        assert_eq!(a, b);
    }

    proptest! {
        /// Randomized add/remove sequences: the set's size, membership and
        /// ascending iteration always agree with a model BTreeSet.
        #[test]
        fn behaves_like_model(ops in prop::collection::vec((any::<i16>(), any::<bool>()), 1..400)) {
            let mut set = IntSet::new();
            let mut model = std::collections::BTreeSet::new();
            for (raw, insert) in ops {
                let value = i32::from(raw);
                if insert {
                    prop_assert_eq!(set.add(value), model.insert(value));
                } else {
                    prop_assert_eq!(set.remove(value), model.remove(&value));
                }
                prop_assert_eq!(set.len(), model.len());
            }
            let collected: Vec<i32> = set.iter().collect();
            let expected: Vec<i32> = model.iter().copied().collect();
            prop_assert_eq!(collected, expected);
            for probe in [-40000, -1, 0, 1, 777, 40000] {
                prop_assert_eq!(set.floor(probe), model.range(..=probe).next_back().copied());
                prop_assert_eq!(set.ceiling(probe), model.range(probe..).next().copied());
            }
        }
    }
}
