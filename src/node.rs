//! Node layout and the structural algorithms: search, split, borrow, merge,
//! the recursive insert/remove protocol and teardown.
//!
//! A node holds between `B-1` and `2B-1` key/value pairs (the root may hold fewer).
//! Internal nodes additionally own `len+1` child trees. The height of a node is
//! not stored in it, it travels alongside in [`NodeRef`] and [`NodeMut`].

use crate::compare::Compare;
use crate::vecs::{safe_assert, FixedCapIter, FixedCapVec};
use std::{iter::Zip, mem};

/// Keys and values of a node, parallel arrays with capacity `2B-1`.
pub(crate) struct Pairs<K, V, const B: usize> {
    keys: FixedCapVec<K>,
    vals: FixedCapVec<V>,
}

impl<K, V, const B: usize> Drop for Pairs<K, V, B> {
    fn drop(&mut self) {
        self.keys.free(Self::CAP);
        self.vals.free(Self::CAP);
    }
}

/// Unallocated, used as a placeholder when entries are moved out during teardown.
impl<K, V, const B: usize> Default for Pairs<K, V, B> {
    fn default() -> Self {
        Self {
            keys: FixedCapVec::default(),
            vals: FixedCapVec::default(),
        }
    }
}

impl<K, V, const B: usize> Pairs<K, V, B> {
    /// Maximum number of key/value pairs in a node.
    pub const CAP: usize = 2 * B - 1;

    fn new() -> Self {
        Self {
            keys: FixedCapVec::new(Self::CAP),
            vals: FixedCapVec::new(Self::CAP),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn key(&self, i: usize) -> &K {
        self.keys.ix(i)
    }

    #[inline]
    pub fn val(&self, i: usize) -> &V {
        self.vals.ix(i)
    }

    #[inline]
    pub fn kv_mut(&mut self, i: usize) -> (&K, &mut V) {
        (self.keys.ix(i), self.vals.ixm(i))
    }

    /// Keys as a slice and values as a mutable slice.
    pub fn slices_mut(&mut self) -> (&[K], &mut [V]) {
        (&self.keys[..], &mut self.vals[..])
    }

    /// Index of the first key that is not less than `key`, `Ok` if it is equal.
    #[inline]
    pub fn search<C: Compare<K>>(&self, key: &K, cmp: &C) -> Result<usize, usize> {
        self.keys.search(|k| cmp.compare(key, k))
    }

    fn push(&mut self, key: K, value: V) {
        safe_assert!(self.len() < Self::CAP);
        unsafe {
            self.keys.push(key);
            self.vals.push(value);
        }
    }

    fn pop(&mut self) -> Option<(K, V)> {
        let key = self.keys.pop()?;
        let value = self.vals.pop()?;
        Some((key, value))
    }

    fn insert(&mut self, at: usize, key: K, value: V) {
        safe_assert!(self.len() < Self::CAP);
        unsafe {
            self.keys.insert(at, key);
            self.vals.insert(at, value);
        }
    }

    fn remove(&mut self, at: usize) -> (K, V) {
        (self.keys.remove(at), self.vals.remove(at))
    }

    fn replace(&mut self, at: usize, (key, value): (K, V)) -> (K, V) {
        (self.keys.replace(at, key), self.vals.replace(at, value))
    }

    fn replace_val(&mut self, at: usize, value: V) -> V {
        self.vals.replace(at, value)
    }

    fn swap(&mut self, i: usize, other: &mut Self, j: usize) {
        mem::swap(self.keys.ixm(i), other.keys.ixm(j));
        mem::swap(self.vals.ixm(i), other.vals.ixm(j));
    }

    /// Entries `at+1..` move to a new node, entry `at` is returned as the median.
    fn split(&mut self, at: usize) -> ((K, V), Self) {
        safe_assert!(at < self.len());
        let right = Self {
            keys: self.keys.split_off(at + 1, Self::CAP),
            vals: self.vals.split_off(at + 1, Self::CAP),
        };
        let Some(med) = self.pop() else {
            unreachable!("split point beyond node length")
        };
        (med, right)
    }

    /// Append separator `sep` followed by every entry of `right`.
    fn absorb(&mut self, sep: (K, V), right: &mut Self) {
        safe_assert!(self.len() + 1 + right.len() <= Self::CAP);
        self.push(sep.0, sep.1);
        unsafe {
            self.keys.append(&mut right.keys);
            self.vals.append(&mut right.vals);
        }
    }

    /// Move `shift` entries from the end of `left`, through separator `sep` of `parent`,
    /// to the front of self.
    fn steal_back(&mut self, left: &mut Self, parent: &mut Self, sep: usize, shift: usize) {
        safe_assert!(shift >= 1 && self.len() + shift <= Self::CAP);
        unsafe {
            self.keys.steal_back(&mut left.keys, shift);
            self.vals.steal_back(&mut left.vals, shift);
        }
        // Entry 0 becomes the new separator, the old one goes just after the moved block.
        self.swap(0, parent, sep);
        self.keys[..shift].rotate_left(1);
        self.vals[..shift].rotate_left(1);
    }

    /// Move `shift` entries from the front of `right`, through separator `sep` of `parent`,
    /// to the end of self.
    fn steal_front(&mut self, right: &mut Self, parent: &mut Self, sep: usize, shift: usize) {
        safe_assert!(shift >= 1 && self.len() + shift <= Self::CAP);
        let len = self.len();
        unsafe {
            self.keys.steal_front(&mut right.keys, shift);
            self.vals.steal_front(&mut right.vals, shift);
        }
        // Last entry becomes the new separator, the old one goes just before the moved block.
        self.swap(len + shift - 1, parent, sep);
        self.keys[len..].rotate_right(1);
        self.vals[len..].rotate_right(1);
    }

    /// Consume the node, yielding its entries in order.
    fn into_entries(mut self) -> Zip<FixedCapIter<K>, FixedCapIter<V>> {
        let keys = mem::take(&mut self.keys).fc_iter(Self::CAP);
        let vals = mem::take(&mut self.vals).fc_iter(Self::CAP);
        keys.zip(vals)
    }
}

/// Uniform access to the key/value part of a node, whatever its kind.
pub(crate) trait NodeData<K, V, const B: usize> {
    fn data(&self) -> &Pairs<K, V, B>;
    fn data_mut(&mut self) -> &mut Pairs<K, V, B>;
}

pub(crate) struct Leaf<K, V, const B: usize> {
    data: Pairs<K, V, B>,
}

pub(crate) struct Internal<K, V, const B: usize> {
    data: Pairs<K, V, B>,
    /// `data.len() + 1` children.
    c: FixedCapVec<Tree<K, V, B>>,
}

impl<K, V, const B: usize> Drop for Internal<K, V, B> {
    fn drop(&mut self) {
        self.c.free(Self::CHILD_CAP);
    }
}

impl<K, V, const B: usize> NodeData<K, V, B> for Leaf<K, V, B> {
    fn data(&self) -> &Pairs<K, V, B> {
        &self.data
    }
    fn data_mut(&mut self) -> &mut Pairs<K, V, B> {
        &mut self.data
    }
}

impl<K, V, const B: usize> NodeData<K, V, B> for Internal<K, V, B> {
    fn data(&self) -> &Pairs<K, V, B> {
        &self.data
    }
    fn data_mut(&mut self) -> &mut Pairs<K, V, B> {
        &mut self.data
    }
}

/// A node: either a leaf or an internal node, the latter boxed to keep `Tree` small.
pub(crate) enum Tree<K, V, const B: usize> {
    L(Leaf<K, V, B>),
    NL(Box<Internal<K, V, B>>),
}

impl<K, V, const B: usize> NodeData<K, V, B> for Tree<K, V, B> {
    #[inline]
    fn data(&self) -> &Pairs<K, V, B> {
        match self {
            Tree::L(leaf) => leaf.data(),
            Tree::NL(nl) => nl.data(),
        }
    }
    #[inline]
    fn data_mut(&mut self) -> &mut Pairs<K, V, B> {
        match self {
            Tree::L(leaf) => leaf.data_mut(),
            Tree::NL(nl) => nl.data_mut(),
        }
    }
}

impl<K, V, const B: usize> Tree<K, V, B> {
    /// A root leaf holding a single entry.
    pub fn leaf_with(key: K, value: V) -> Self {
        let mut data = Pairs::new();
        data.push(key, value);
        Tree::L(Leaf { data })
    }

    /// A root with one separator and two children, used when the old root splits.
    pub fn new_root(left: Self, (key, value): (K, V), right: Self) -> Self {
        let mut nl = Internal::new();
        nl.data.push(key, value);
        // Capacity is CAP+1 >= 2.
        unsafe {
            nl.c.push(left);
            nl.c.push(right);
        }
        Tree::NL(nl)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Split a node into the pieces a mutable iterator walks over.
    pub fn iter_parts_mut(&mut self) -> (&[K], &mut [V], Option<&mut [Tree<K, V, B>]>) {
        match self {
            Tree::L(leaf) => {
                let (keys, vals) = leaf.data.slices_mut();
                (keys, vals, None)
            }
            Tree::NL(nl) => {
                let (keys, vals, c) = nl.parts_mut();
                (keys, vals, Some(c))
            }
        }
    }

    /// Remove the only child of an internal node with no keys.
    pub fn take_only_child(&mut self) -> Option<Self> {
        match self {
            Tree::NL(nl) if nl.data.len() == 0 => {
                safe_assert!(nl.c.len() == 1);
                nl.c.pop()
            }
            _ => None,
        }
    }

    /// Free the subtree, handing every entry to `f` first.
    /// Children are drained before the entries of their parent.
    pub fn dealloc_with<F>(self, f: &mut F)
    where
        F: FnMut(K, V),
    {
        match self {
            Tree::L(leaf) => {
                for (k, v) in leaf.data.into_entries() {
                    f(k, v);
                }
            }
            Tree::NL(mut nl) => {
                let children = mem::take(&mut nl.c).fc_iter(Internal::<K, V, B>::CHILD_CAP);
                for child in children {
                    child.dealloc_with(f);
                }
                for (k, v) in mem::take(&mut nl.data).into_entries() {
                    f(k, v);
                }
            }
        }
    }
}

impl<K, V, const B: usize> Internal<K, V, B> {
    const CHILD_CAP: usize = 2 * B;

    fn new() -> Box<Self> {
        Box::new(Self {
            data: Pairs::new(),
            c: FixedCapVec::new(Self::CHILD_CAP),
        })
    }

    /// Keys, values and children of the node.
    pub fn parts_mut(&mut self) -> (&[K], &mut [V], &mut [Tree<K, V, B>]) {
        let (keys, vals) = self.data.slices_mut();
        (keys, vals, &mut self.c[..])
    }

    /// Children `index - 1` and `index`.
    fn siblings_mut(
        c: &mut FixedCapVec<Tree<K, V, B>>,
        index: usize,
    ) -> (&mut Tree<K, V, B>, &mut Tree<K, V, B>) {
        let (head, tail) = c.split_at_mut(index);
        (&mut head[index - 1], &mut tail[0])
    }

    /// Child `index` underflows, its left sibling has entries to spare.
    fn borrow_from_left(&mut self, index: usize) {
        let Self { data, c } = self;
        let (left, right) = Self::siblings_mut(c, index);
        let shift = (left.len() + right.len()) / 2 - right.len();
        match (left, right) {
            (Tree::L(l), Tree::L(r)) => r.data.steal_back(&mut l.data, data, index - 1, shift),
            (Tree::NL(l), Tree::NL(r)) => {
                r.data.steal_back(&mut l.data, data, index - 1, shift);
                safe_assert!(r.c.len() + shift <= Self::CHILD_CAP);
                unsafe { r.c.steal_back(&mut l.c, shift) }
            }
            _ => unreachable!("siblings at different heights"),
        }
    }

    /// Child `index` underflows, its right sibling has entries to spare.
    fn borrow_from_right(&mut self, index: usize) {
        let Self { data, c } = self;
        let (left, right) = Self::siblings_mut(c, index + 1);
        let shift = (left.len() + right.len()) / 2 - left.len();
        match (left, right) {
            (Tree::L(l), Tree::L(r)) => l.data.steal_front(&mut r.data, data, index, shift),
            (Tree::NL(l), Tree::NL(r)) => {
                l.data.steal_front(&mut r.data, data, index, shift);
                safe_assert!(l.c.len() + shift <= Self::CHILD_CAP);
                unsafe { l.c.steal_front(&mut r.c, shift) }
            }
            _ => unreachable!("siblings at different heights"),
        }
    }

    /// Fold child `index + 1` and separator `index` into child `index`.
    fn merge(&mut self, index: usize) {
        let sep = self.data.remove(index);
        let right = self.c.remove(index + 1);
        match (self.c.ixm(index), right) {
            (Tree::L(l), Tree::L(mut r)) => l.data.absorb(sep, &mut r.data),
            (Tree::NL(l), Tree::NL(mut r)) => {
                l.data.absorb(sep, &mut r.data);
                safe_assert!(l.c.len() + r.c.len() <= Self::CHILD_CAP);
                unsafe { l.c.append(&mut r.c) }
            }
            _ => unreachable!("siblings at different heights"),
        }
        // The absorbed node is dropped here, it no longer owns any entry or child.
    }

    /// Repair child `index` if it has fewer than `B-1` entries.
    fn check_underflow(&mut self, index: usize) {
        if self.c.ix(index).len() >= B - 1 {
            return;
        }
        if index == 0 {
            if self.c.ix(1).len() > B {
                self.borrow_from_right(0);
            } else {
                self.merge(0);
            }
        } else if self.c.ix(index - 1).len() > B {
            self.borrow_from_left(index);
        } else {
            self.merge(index - 1);
        }
    }
}

/// Which half of a split node receives the pending entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Choose where a full node is split when an entry is about to be inserted at `index`.
///
/// Returns the index of the median, the half receiving the entry and the entry's
/// index within that half. Both halves end up with at least `B-1` entries.
fn find_splitpoint<const B: usize>(index: usize) -> (usize, Side, usize) {
    let center = B - 1;
    if index < center {
        (center - 1, Side::Left, index)
    } else if index == center {
        (center, Side::Left, index)
    } else if index == center + 1 {
        (center, Side::Right, 0)
    } else {
        (center + 1, Side::Right, index - center - 2)
    }
}

/// Median and new right sibling produced by a split.
pub(crate) type Split<K, V, const B: usize> = ((K, V), Tree<K, V, B>);

/// Outcome of inserting into a subtree.
pub(crate) enum Inserted<K, V, const B: usize> {
    /// Key was present, holds the previous value.
    Replaced(V),
    /// New entry absorbed without splitting this node.
    Fit,
    /// This node split, the caller must insert the median and the new sibling.
    Split(Split<K, V, B>),
}

/// Shared view of a node together with its height (0 for a leaf).
pub(crate) struct NodeRef<'a, K, V, const B: usize> {
    node: &'a Tree<K, V, B>,
    height: usize,
}

impl<K, V, const B: usize> Clone for NodeRef<'_, K, V, B> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K, V, const B: usize> Copy for NodeRef<'_, K, V, B> {}

impl<'a, K, V, const B: usize> NodeRef<'a, K, V, B> {
    pub fn new(node: &'a Tree<K, V, B>, height: usize) -> Self {
        Self { node, height }
    }

    #[inline]
    pub fn is_leaf(self) -> bool {
        self.height == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.node.len()
    }

    #[inline]
    pub fn search<C: Compare<K>>(self, key: &K, cmp: &C) -> Result<usize, usize> {
        self.node.data().search(key, cmp)
    }

    #[inline]
    pub fn key_value(self, i: usize) -> (&'a K, &'a V) {
        let data = self.node.data();
        (data.key(i), data.val(i))
    }

    /// Child `i`, one level down.
    pub fn descend(self, i: usize) -> Self {
        safe_assert!(self.height > 0 && i <= self.len());
        match self.node {
            Tree::NL(nl) => Self {
                node: nl.c.ix(i),
                height: self.height - 1,
            },
            Tree::L(_) => unreachable!("descend from a leaf"),
        }
    }

    /// Leftmost leaf of the subtree.
    pub fn first_leaf(mut self) -> Self {
        while !self.is_leaf() {
            self = self.descend(0);
        }
        self
    }

    /// Rightmost leaf of the subtree.
    pub fn last_leaf(mut self) -> Self {
        while !self.is_leaf() {
            self = self.descend(self.len());
        }
        self
    }

    /// Assert every structural invariant of the subtree, returning its entry count.
    #[cfg(test)]
    pub fn check<C: Compare<K>>(
        self,
        cmp: &C,
        lo: Option<&K>,
        hi: Option<&K>,
        is_root: bool,
    ) -> usize {
        use std::cmp::Ordering;
        let len = self.len();
        assert_eq!(self.is_leaf(), matches!(self.node, Tree::L(_)), "leaf depth");
        assert!(len <= Pairs::<K, V, B>::CAP, "node over capacity");
        if is_root {
            assert!(len >= 1, "empty root");
        } else {
            assert!(len >= B - 1, "node underflow");
        }
        let data = self.node.data();
        for i in 0..len {
            let k = data.key(i);
            if i > 0 {
                assert_eq!(cmp.compare(data.key(i - 1), k), Ordering::Less, "unsorted");
            }
            if let Some(lo) = lo {
                assert_eq!(cmp.compare(lo, k), Ordering::Less, "below separator");
            }
            if let Some(hi) = hi {
                assert_eq!(cmp.compare(k, hi), Ordering::Less, "above separator");
            }
        }
        let mut count = len;
        if let Tree::NL(nl) = self.node {
            assert_eq!(nl.c.len(), len + 1, "child count");
            for i in 0..=len {
                let lo = if i == 0 { lo } else { Some(data.key(i - 1)) };
                let hi = if i == len { hi } else { Some(data.key(i)) };
                count += self.descend(i).check(cmp, lo, hi, false);
            }
        }
        count
    }
}

/// Exclusive view of a node together with its height.
pub(crate) struct NodeMut<'a, K, V, const B: usize> {
    node: &'a mut Tree<K, V, B>,
    height: usize,
}

impl<'a, K, V, const B: usize> NodeMut<'a, K, V, B> {
    pub fn new(node: &'a mut Tree<K, V, B>, height: usize) -> Self {
        Self { node, height }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.height == 0
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.node.len() == Pairs::<K, V, B>::CAP
    }

    #[inline]
    pub fn search<C: Compare<K>>(&self, key: &K, cmp: &C) -> Result<usize, usize> {
        self.node.data().search(key, cmp)
    }

    fn internal(&mut self) -> &mut Internal<K, V, B> {
        safe_assert!(self.height > 0);
        match self.node {
            Tree::NL(nl) => nl,
            Tree::L(_) => unreachable!("leaf at non-zero height"),
        }
    }

    fn child(&mut self, i: usize) -> NodeMut<'_, K, V, B> {
        let height = self.height - 1;
        NodeMut {
            node: self.internal().c.ixm(i),
            height,
        }
    }

    /// Child `i`, one level down, keeping the full borrow.
    pub fn into_child(self, i: usize) -> Self {
        let Self { node, height } = self;
        safe_assert!(height > 0);
        match node {
            Tree::NL(nl) => Self {
                node: nl.c.ixm(i),
                height: height - 1,
            },
            Tree::L(_) => unreachable!("descend from a leaf"),
        }
    }

    pub fn into_kv_mut(self, i: usize) -> (&'a K, &'a mut V) {
        let node = self.node;
        node.data_mut().kv_mut(i)
    }

    /// Insert or overwrite, reporting a split of this node to the caller.
    pub fn insert<C: Compare<K>>(mut self, key: K, value: V, cmp: &C) -> Inserted<K, V, B> {
        match self.search(&key, cmp) {
            Ok(i) => Inserted::Replaced(self.node.data_mut().replace_val(i, value)),
            Err(i) if self.is_leaf() => self.insert_at(i, key, value, None),
            Err(i) => match self.child(i).insert(key, value, cmp) {
                Inserted::Split(((k, v), right)) => self.insert_at(i, k, v, Some(right)),
                done => done,
            },
        }
    }

    /// Insert an entry at `i` (and, for an internal node, `edge` as child `i + 1`),
    /// splitting first if the node is full.
    fn insert_at(&mut self, i: usize, key: K, value: V, edge: Option<Tree<K, V, B>>) -> Inserted<K, V, B> {
        if !self.is_full() {
            self.insert_fit(i, key, value, edge);
            return Inserted::Fit;
        }
        let (middle, side, at) = find_splitpoint::<B>(i);
        let (med, mut right) = self.split(middle);
        match side {
            Side::Left => self.insert_fit(at, key, value, edge),
            Side::Right => NodeMut::new(&mut right, self.height).insert_fit(at, key, value, edge),
        }
        Inserted::Split((med, right))
    }

    fn insert_fit(&mut self, i: usize, key: K, value: V, edge: Option<Tree<K, V, B>>) {
        self.node.data_mut().insert(i, key, value);
        if let Some(edge) = edge {
            let c = &mut self.internal().c;
            safe_assert!(c.len() < Internal::<K, V, B>::CHILD_CAP);
            unsafe { c.insert(i + 1, edge) }
        }
    }

    /// Divide the node at `at` into self, a median and a new sibling of the same kind.
    fn split(&mut self, at: usize) -> Split<K, V, B> {
        match self.node {
            Tree::L(leaf) => {
                let (med, data) = leaf.data.split(at);
                (med, Tree::L(Leaf { data }))
            }
            Tree::NL(nl) => {
                let (med, data) = nl.data.split(at);
                let c = nl.c.split_off(at + 1, Internal::<K, V, B>::CHILD_CAP);
                (med, Tree::NL(Box::new(Internal { data, c })))
            }
        }
    }

    /// Remove `key` from the subtree, repairing underflow on the way back up.
    pub fn remove<C: Compare<K>>(mut self, key: &K, cmp: &C) -> Option<(K, V)> {
        match self.search(key, cmp) {
            Ok(i) if self.is_leaf() => Some(self.node.data_mut().remove(i)),
            Ok(i) => {
                // Replace with the successor, the least entry of the right subtree.
                let least = self.child(i + 1).remove_least();
                let removed = self.node.data_mut().replace(i, least);
                self.internal().check_underflow(i + 1);
                Some(removed)
            }
            Err(_) if self.is_leaf() => None,
            Err(i) => {
                let removed = self.child(i).remove(key, cmp)?;
                self.internal().check_underflow(i);
                Some(removed)
            }
        }
    }

    /// Remove the smallest entry of a non-empty subtree.
    pub fn remove_least(mut self) -> (K, V) {
        if self.is_leaf() {
            return self.node.data_mut().remove(0);
        }
        let least = self.child(0).remove_least();
        self.internal().check_underflow(0);
        least
    }
}
