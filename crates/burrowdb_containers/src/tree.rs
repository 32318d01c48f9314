//! Arena-backed red-black tree shared by the integer containers.
//!
//! Nodes are slots in a flat `Vec`; child and parent "pointers" are typed
//! [`SlotId`] indices into that arena. Deleting a node moves the arena's
//! last slot into the hole, so the backing storage stays dense and only
//! ever grows with the high-water element count.

use crate::error::{ContainerError, ContainerResult};

/// Index of a slot in the tree arena.
///
/// `SlotId::NIL` plays the role of a null pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotId(u32);

impl SlotId {
    pub(crate) const NIL: SlotId = SlotId(u32::MAX);

    fn new(index: usize) -> SlotId {
        debug_assert!(index < u32::MAX as usize);
        SlotId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }

    fn is_nil(self) -> bool {
        self == SlotId::NIL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

/// A single arena slot: one tree node plus its payload.
///
/// The color could be packed into the parent word's sign bit; a separate
/// field costs one byte per slot and keeps the link arithmetic readable,
/// which matters more here than cache packing.
#[derive(Debug, Clone)]
struct Slot<P> {
    key: i32,
    parent: SlotId,
    left: SlotId,
    right: SlotId,
    color: Color,
    payload: P,
}

/// The shared tree structure.
#[derive(Debug, Clone)]
pub(crate) struct Tree<P> {
    slots: Vec<Slot<P>>,
    root: SlotId,
    /// Bumped on every structural change; cursors fail fast against it.
    mods: u64,
}

impl<P> Default for Tree<P> {
    fn default() -> Tree<P> {
        Tree::new()
    }
}

impl<P> Tree<P> {
    pub(crate) fn new() -> Tree<P> {
        Tree {
            slots: Vec::new(),
            root: SlotId::NIL,
            mods: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Tree<P> {
        Tree {
            slots: Vec::with_capacity(capacity),
            root: SlotId::NIL,
            mods: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn mods(&self) -> u64 {
        self.mods
    }

    pub(crate) fn key(&self, id: SlotId) -> i32 {
        self.slots[id.index()].key
    }

    pub(crate) fn payload(&self, id: SlotId) -> &P {
        &self.slots[id.index()].payload
    }

    pub(crate) fn payload_mut(&mut self, id: SlotId) -> &mut P {
        &mut self.slots[id.index()].payload
    }

    fn left(&self, id: SlotId) -> SlotId {
        if id.is_nil() {
            SlotId::NIL
        } else {
            self.slots[id.index()].left
        }
    }

    fn right(&self, id: SlotId) -> SlotId {
        if id.is_nil() {
            SlotId::NIL
        } else {
            self.slots[id.index()].right
        }
    }

    fn parent(&self, id: SlotId) -> SlotId {
        if id.is_nil() {
            SlotId::NIL
        } else {
            self.slots[id.index()].parent
        }
    }

    fn set_left(&mut self, id: SlotId, child: SlotId) {
        self.slots[id.index()].left = child;
    }

    fn set_right(&mut self, id: SlotId, child: SlotId) {
        self.slots[id.index()].right = child;
    }

    fn set_parent(&mut self, id: SlotId, parent: SlotId) {
        self.slots[id.index()].parent = parent;
    }

    /// A nil node counts as black.
    fn is_red(&self, id: SlotId) -> bool {
        !id.is_nil() && self.slots[id.index()].color == Color::Red
    }

    fn is_black(&self, id: SlotId) -> bool {
        !self.is_red(id)
    }

    fn set_color(&mut self, id: SlotId, color: Color) {
        if !id.is_nil() {
            self.slots[id.index()].color = color;
        }
    }

    /// Finds the slot holding `key`.
    pub(crate) fn find(&self, key: i32) -> Option<SlotId> {
        let mut i = self.root;
        while !i.is_nil() {
            let k = self.key(i);
            if k == key {
                return Some(i);
            }
            i = if key < k { self.left(i) } else { self.right(i) };
        }
        None
    }

    pub(crate) fn contains(&self, key: i32) -> bool {
        self.find(key).is_some()
    }

    /// Slot with the largest key `<= key`.
    pub(crate) fn floor_slot(&self, key: i32) -> Option<SlotId> {
        let mut i = self.root;
        let mut best = SlotId::NIL;
        while !i.is_nil() {
            let k = self.key(i);
            if k == key {
                return Some(i);
            }
            if k > key {
                i = self.left(i);
            } else {
                best = i;
                i = self.right(i);
            }
        }
        if best.is_nil() {
            None
        } else {
            Some(best)
        }
    }

    /// Slot with the smallest key `>= key`.
    pub(crate) fn ceiling_slot(&self, key: i32) -> Option<SlotId> {
        let mut i = self.root;
        let mut best = SlotId::NIL;
        while !i.is_nil() {
            let k = self.key(i);
            if k == key {
                return Some(i);
            }
            if k < key {
                i = self.right(i);
            } else {
                best = i;
                i = self.left(i);
            }
        }
        if best.is_nil() {
            None
        } else {
            Some(best)
        }
    }

    /// Leftmost slot, i.e. the minimum key.
    pub(crate) fn min_slot(&self) -> Option<SlotId> {
        if self.root.is_nil() {
            return None;
        }
        let mut i = self.root;
        while !self.left(i).is_nil() {
            i = self.left(i);
        }
        Some(i)
    }

    /// In-order successor of `id`.
    pub(crate) fn successor(&self, id: SlotId) -> SlotId {
        if id.is_nil() {
            return SlotId::NIL;
        }
        let mut j = self.right(id);
        if !j.is_nil() {
            while !self.left(j).is_nil() {
                j = self.left(j);
            }
            return j;
        }
        let mut i = id;
        j = self.parent(i);
        while !j.is_nil() && self.right(j) == i {
            i = j;
            j = self.parent(j);
        }
        j
    }

    /// Inserts `key` with `payload`.
    ///
    /// If the key is already present, replaces its payload and returns the
    /// old one; this does not count as a structural modification.
    pub(crate) fn insert(&mut self, key: i32, payload: P) -> Option<P> {
        if self.root.is_nil() {
            self.root = self.new_slot(key, SlotId::NIL, payload);
            self.set_color(self.root, Color::Black);
            self.mods += 1;
            return None;
        }
        let mut i = self.root;
        loop {
            let k = self.key(i);
            if key == k {
                return Some(std::mem::replace(self.payload_mut(i), payload));
            }
            if key < k {
                if self.left(i).is_nil() {
                    let n = self.new_slot(key, i, payload);
                    self.set_left(i, n);
                    self.rebalance_insert(n);
                    self.mods += 1;
                    return None;
                }
                i = self.left(i);
            } else {
                if self.right(i).is_nil() {
                    let n = self.new_slot(key, i, payload);
                    self.set_right(i, n);
                    self.rebalance_insert(n);
                    self.mods += 1;
                    return None;
                }
                i = self.right(i);
            }
        }
    }

    fn new_slot(&mut self, key: i32, parent: SlotId, payload: P) -> SlotId {
        let id = SlotId::new(self.slots.len());
        self.slots.push(Slot {
            key,
            parent,
            left: SlotId::NIL,
            right: SlotId::NIL,
            color: Color::Red,
            payload,
        });
        id
    }

    /// Removes `key`, returning its payload if present.
    pub(crate) fn remove(&mut self, key: i32) -> Option<P> {
        let target = self.find(key)?;
        Some(self.delete_slot(target))
    }

    /// Unlinks `target` from the tree and reclaims its slot.
    fn delete_slot(&mut self, target: SlotId) -> P {
        self.mods += 1;
        let mut p = target;

        // Two children: pull the successor's key into the target and
        // delete the successor's slot instead. The payload being removed
        // rides along into the successor slot so the swap-remove below
        // returns it.
        if !self.left(p).is_nil() && !self.right(p).is_nil() {
            let s = self.successor(p);
            let skey = self.key(s);
            self.slots[p.index()].key = skey;
            self.swap_payloads(p, s);
            p = s;
        }

        let replacement = if !self.left(p).is_nil() {
            self.left(p)
        } else {
            self.right(p)
        };

        if !replacement.is_nil() {
            // Splice the single child into the parent link.
            let parent = self.parent(p);
            self.set_parent(replacement, parent);
            if parent.is_nil() {
                self.root = replacement;
            } else if self.left(parent) == p {
                self.set_left(parent, replacement);
            } else {
                self.set_right(parent, replacement);
            }
            self.set_left(p, SlotId::NIL);
            self.set_right(p, SlotId::NIL);
            self.set_parent(p, SlotId::NIL);
            if self.is_black(p) {
                self.rebalance_delete(replacement);
            }
        } else if self.parent(p).is_nil() {
            self.root = SlotId::NIL;
        } else {
            // Leaf: fix the missing black while still linked, then unlink.
            if self.is_black(p) {
                self.rebalance_delete(p);
            }
            let parent = self.parent(p);
            if !parent.is_nil() {
                if self.left(parent) == p {
                    self.set_left(parent, SlotId::NIL);
                } else if self.right(parent) == p {
                    self.set_right(parent, SlotId::NIL);
                }
                self.set_parent(p, SlotId::NIL);
            }
        }

        self.relocate_last_into(p)
    }

    /// Reclaims slot `hole` by moving the arena's last slot into it and
    /// patching every link that referred to the moved slot. All of the
    /// index arithmetic for compaction lives here.
    fn relocate_last_into(&mut self, hole: SlotId) -> P {
        let last = SlotId::new(self.slots.len() - 1);
        let dead = self.slots.swap_remove(hole.index());
        if hole != last {
            // The slot formerly at `last` now occupies `hole`.
            let parent = self.parent(hole);
            if parent.is_nil() {
                self.root = hole;
            } else if self.left(parent) == last {
                self.set_left(parent, hole);
            } else {
                self.set_right(parent, hole);
            }
            let left = self.left(hole);
            if !left.is_nil() {
                self.set_parent(left, hole);
            }
            let right = self.right(hole);
            if !right.is_nil() {
                self.set_parent(right, hole);
            }
        }
        dead.payload
    }

    fn swap_payloads(&mut self, a: SlotId, b: SlotId) {
        if a == b {
            return;
        }
        let (lo, hi) = if a.index() < b.index() {
            (a.index(), b.index())
        } else {
            (b.index(), a.index())
        };
        let (front, back) = self.slots.split_at_mut(hi);
        std::mem::swap(&mut front[lo].payload, &mut back[0].payload);
    }

    fn rotate_left(&mut self, i: SlotId) {
        let r = self.right(i);
        self.set_right(i, self.left(r));
        if !self.left(r).is_nil() {
            let lr = self.left(r);
            self.set_parent(lr, i);
        }
        let parent = self.parent(i);
        self.set_parent(r, parent);
        if parent.is_nil() {
            self.root = r;
        } else if self.left(parent) == i {
            self.set_left(parent, r);
        } else {
            self.set_right(parent, r);
        }
        self.set_left(r, i);
        self.set_parent(i, r);
    }

    fn rotate_right(&mut self, i: SlotId) {
        let l = self.left(i);
        self.set_left(i, self.right(l));
        if !self.right(l).is_nil() {
            let rl = self.right(l);
            self.set_parent(rl, i);
        }
        let parent = self.parent(i);
        self.set_parent(l, parent);
        if parent.is_nil() {
            self.root = l;
        } else if self.right(parent) == i {
            self.set_right(parent, l);
        } else {
            self.set_left(parent, l);
        }
        self.set_right(l, i);
        self.set_parent(i, l);
    }

    fn rebalance_insert(&mut self, inserted: SlotId) {
        let mut x = inserted;
        self.set_color(x, Color::Red);
        while !x.is_nil() && x != self.root && self.is_red(self.parent(x)) {
            let mut p = self.parent(x);
            let mut g = self.parent(p);
            if p == self.left(g) {
                let y = self.right(g);
                if self.is_red(y) {
                    self.set_color(p, Color::Black);
                    self.set_color(y, Color::Black);
                    self.set_color(g, Color::Red);
                    x = g;
                } else {
                    if x == self.right(p) {
                        x = p;
                        self.rotate_left(x);
                        p = self.parent(x);
                        g = self.parent(p);
                    }
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    if !g.is_nil() {
                        self.rotate_right(g);
                    }
                }
            } else {
                let y = self.left(g);
                if self.is_red(y) {
                    self.set_color(p, Color::Black);
                    self.set_color(y, Color::Black);
                    self.set_color(g, Color::Red);
                    x = g;
                } else {
                    if x == self.left(p) {
                        x = p;
                        self.rotate_right(x);
                        p = self.parent(x);
                        g = self.parent(p);
                    }
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    if !g.is_nil() {
                        self.rotate_left(g);
                    }
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    fn rebalance_delete(&mut self, from: SlotId) {
        let mut x = from;
        while x != self.root && self.is_black(x) {
            let p = self.parent(x);
            if x == self.left(p) {
                let mut y = self.right(p);
                if self.is_red(y) {
                    self.set_color(y, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    y = self.right(self.parent(x));
                }
                if self.is_black(self.left(y)) && self.is_black(self.right(y)) {
                    self.set_color(y, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.is_black(self.right(y)) {
                        let ly = self.left(y);
                        self.set_color(ly, Color::Black);
                        self.set_color(y, Color::Red);
                        self.rotate_right(y);
                        y = self.right(self.parent(x));
                    }
                    let p = self.parent(x);
                    let pc = if self.is_black(p) {
                        Color::Black
                    } else {
                        Color::Red
                    };
                    self.set_color(y, pc);
                    self.set_color(p, Color::Black);
                    let ry = self.right(y);
                    self.set_color(ry, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                }
            } else {
                let mut y = self.left(p);
                if self.is_red(y) {
                    self.set_color(y, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    y = self.left(self.parent(x));
                }
                if self.is_black(self.right(y)) && self.is_black(self.left(y)) {
                    self.set_color(y, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.is_black(self.left(y)) {
                        let ry = self.right(y);
                        self.set_color(ry, Color::Black);
                        self.set_color(y, Color::Red);
                        self.rotate_left(y);
                        y = self.left(self.parent(x));
                    }
                    let p = self.parent(x);
                    let pc = if self.is_black(p) {
                        Color::Black
                    } else {
                        Color::Red
                    };
                    self.set_color(y, pc);
                    self.set_color(p, Color::Black);
                    let ly = self.left(y);
                    self.set_color(ly, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Ascending borrowing iteration over `(key, &payload)`.
    pub(crate) fn iter(&self) -> TreeIter<'_, P> {
        TreeIter {
            tree: self,
            next: self.min_slot().unwrap_or(SlotId::NIL),
        }
    }
}

/// Borrowing in-order iterator.
pub(crate) struct TreeIter<'a, P> {
    tree: &'a Tree<P>,
    next: SlotId,
}

impl<'a, P> Iterator for TreeIter<'a, P> {
    type Item = (i32, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_nil() {
            return None;
        }
        let id = self.next;
        self.next = self.tree.successor(id);
        Some((self.tree.key(id), self.tree.payload(id)))
    }
}

/// Detached fail-fast cursor.
///
/// A cursor does not borrow its tree; each call revalidates the tree's
/// modification counter and fails with
/// [`ContainerError::ConcurrentModification`] if the tree changed since
/// the cursor was created.
#[derive(Debug, Clone)]
pub(crate) struct TreeCursor {
    expected_mods: u64,
    last_key: Option<i32>,
    started: bool,
}

impl TreeCursor {
    pub(crate) fn new<P>(tree: &Tree<P>) -> TreeCursor {
        TreeCursor {
            expected_mods: tree.mods(),
            last_key: None,
            started: false,
        }
    }

    /// Advances to the next key in ascending order.
    pub(crate) fn next<'a, P>(
        &mut self,
        tree: &'a Tree<P>,
    ) -> ContainerResult<Option<(i32, &'a P)>> {
        if tree.mods() != self.expected_mods {
            return Err(ContainerError::ConcurrentModification);
        }
        let slot = if !self.started {
            self.started = true;
            tree.min_slot()
        } else {
            match self.last_key {
                // The counter matched, so the tree is unchanged and the
                // ceiling of last_key + 1 is exactly the successor.
                Some(k) if k < i32::MAX => tree.ceiling_slot(k + 1),
                _ => None,
            }
        };
        match slot {
            Some(id) => {
                let key = tree.key(id);
                self.last_key = Some(key);
                Ok(Some((key, tree.payload(id))))
            }
            None => {
                self.last_key = Some(i32::MAX);
                Ok(None)
            }
        }
    }
}
