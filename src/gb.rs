/// Ordered map built on a B-tree of minimum branching factor `B`, ordered by comparator `C`.
///
/// Every node other than the root holds between `B-1` and `2B-1` key/value pairs.
/// `B` must be at least 2, a good value is 6.
///
/// General guide to implementation:
///
/// [`BTreeMap`] has a length, an optional root `Tree` and the height of the root.
/// No node is allocated until the first insert, and the root is freed again when the last entry is removed.
///
/// Insert and remove recurse down from the root (see the `node` module). A node that overflows
/// is split and the median passed up to its parent, a node that underflows borrows from or is merged
/// with a sibling. If the root splits a new root is made above it, if the root runs out of keys its
/// only child replaces it.
///
/// [`Iter`] walks the tree with an explicit stack of (node, resume index) frames, so it never recurses
/// and does not allocate.
pub struct BTreeMap<K, V, const B: usize, C = Natural> {
    len: usize,
    root: Option<Tree<K, V, B>>,
    height: usize,
    cmp: C,
}
impl<K, V, const B: usize, C: Default> Default for BTreeMap<K, V, B, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}
impl<K, V, const B: usize> BTreeMap<K, V, B, Natural> {
    /// Returns a new, empty map ordered by [`Ord`]. Does not allocate.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}
impl<K, V, const B: usize, C> BTreeMap<K, V, B, C> {
    /// This should produce a compile-time error if B is too small.
    const CHECK_B: usize = {
        assert!(B >= 2);
        0
    };

    /// Returns a new, empty map ordered by `cmp`. Does not allocate.
    #[must_use]
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            len: Self::CHECK_B,
            root: None,
            height: 0,
            cmp,
        }
    }

    /// Get the comparator.
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Clear the map, freeing every node.
    pub fn clear(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(len = self.len, "clear");
        self.len = 0;
        self.root = None;
    }

    /// Clear the map, passing every key-value pair to `f` before the node holding it is freed.
    pub fn clear_with<F>(&mut self, mut f: F)
    where
        F: FnMut(K, V),
    {
        #[cfg(feature = "tracing")]
        tracing::trace!(len = self.len, "clear with destructor");
        self.len = 0;
        if let Some(root) = self.root.take() {
            root.dealloc_with(&mut f);
        }
    }

    /// Free the map, passing every key-value pair to `f` before the node holding it is freed.
    pub fn dealloc_with<F>(mut self, f: F)
    where
        F: FnMut(K, V),
    {
        self.clear_with(f);
    }

    /// Get number of key-value pairs in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the map empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the root node (0 when the root is a leaf), None if the map is empty.
    #[must_use]
    pub fn height(&self) -> Option<usize> {
        self.root.as_ref().map(|_| self.height)
    }

    /// Insert key-value pair into map, or if key is already in map, replaces value and returns old value.
    /// The key already in the map is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        C: Compare<K>,
    {
        match &mut self.root {
            None => {
                #[cfg(feature = "tracing")]
                tracing::trace!("allocate root leaf");
                self.root = Some(Tree::leaf_with(key, value));
                self.height = 0;
            }
            Some(root) => match NodeMut::new(root, self.height).insert(key, value, &self.cmp) {
                Inserted::Replaced(old) => return Some(old),
                Inserted::Fit => {}
                Inserted::Split(split) => self.grow(split),
            },
        }
        self.len += 1;
        None
    }

    /// Root was split, put a new root above the two halves.
    fn grow(&mut self, (med, right): Split<K, V, B>) {
        if let Some(left) = self.root.take() {
            self.root = Some(Tree::new_root(left, med, right));
            self.height += 1;
            #[cfg(feature = "tracing")]
            tracing::trace!(height = self.height, len = self.len, "root split");
        }
    }

    /// Root may have run out of keys after a removal.
    fn shrink(&mut self) {
        let Some(root) = &mut self.root else {
            return;
        };
        if root.len() > 0 {
            return;
        }
        if self.height == 0 {
            self.root = None;
            #[cfg(feature = "tracing")]
            tracing::trace!("free root leaf");
        } else {
            let child = root.take_only_child();
            self.root = child;
            self.height -= 1;
            #[cfg(feature = "tracing")]
            tracing::trace!(height = self.height, len = self.len, "root collapse");
        }
    }

    /// Does the map have an entry for the specified key.
    pub fn contains_key(&self, key: &K) -> bool
    where
        C: Compare<K>,
    {
        self.get_key_value(key).is_some()
    }

    /// Remove key-value pair from map, returning just the value.
    /// Removing a key that is not present does nothing.
    pub fn remove(&mut self, key: &K) -> Option<V>
    where
        C: Compare<K>,
    {
        self.remove_entry(key).map(|(_k, v)| v)
    }

    /// Remove key-value pair from map.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)>
    where
        C: Compare<K>,
    {
        let root = self.root.as_mut()?;
        let result = NodeMut::new(root, self.height).remove(key, &self.cmp)?;
        self.len -= 1;
        self.shrink();
        Some(result)
    }

    /// Remove first key-value pair from map.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let root = self.root.as_mut()?;
        let result = NodeMut::new(root, self.height).remove_least();
        self.len -= 1;
        self.shrink();
        Some(result)
    }

    /// Get reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V>
    where
        C: Compare<K>,
    {
        self.get_key_value(key).map(|(_k, v)| v)
    }

    /// Get a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V>
    where
        C: Compare<K>,
    {
        let mut node = NodeMut::new(self.root.as_mut()?, self.height);
        loop {
            match node.search(key, &self.cmp) {
                Ok(i) => return Some(node.into_kv_mut(i).1),
                Err(_) if node.is_leaf() => return None,
                Err(i) => node = node.into_child(i),
            }
        }
    }

    /// Get references to the corresponding key and value.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)>
    where
        C: Compare<K>,
    {
        let mut node = self.root_ref()?;
        loop {
            match node.search(key, &self.cmp) {
                Ok(i) => return Some(node.key_value(i)),
                Err(_) if node.is_leaf() => return None,
                Err(i) => node = node.descend(i),
            }
        }
    }

    /// Get references to first key and value.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        Some(self.root_ref()?.first_leaf().key_value(0))
    }

    /// Gets references to last key and value.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let leaf = self.root_ref()?.last_leaf();
        Some(leaf.key_value(leaf.len() - 1))
    }

    fn root_ref(&self) -> Option<NodeRef<'_, K, V, B>> {
        Some(NodeRef::new(self.root.as_ref()?, self.height))
    }

    /// Get iterator of references to key-value pairs, positioned at the smallest key.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, B> {
        Iter::new(self.root_ref(), self.len)
    }

    /// Get iterator of references to keys and mutable references to values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, B> {
        IterMut::new(self.root.as_mut(), self.len)
    }

    /// Get iterator of references to keys.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V, B> {
        Keys(self.iter())
    }

    /// Get iterator of references to values.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V, B> {
        Values(self.iter())
    }

    /// Get iterator of mutable references to values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, B> {
        ValuesMut(self.iter_mut())
    }

    #[cfg(test)]
    pub(crate) fn check(&self)
    where
        C: Compare<K>,
    {
        match self.root_ref() {
            None => assert_eq!(self.len, 0),
            Some(root) => assert_eq!(root.check(&self.cmp, None, None, true), self.len),
        }
    }
} // End impl BTreeMap

impl<K: PartialEq, V: PartialEq, const B: usize, C> PartialEq for BTreeMap<K, V, B, C> {
    fn eq(&self, other: &BTreeMap<K, V, B, C>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}
impl<K: Eq, V: Eq, const B: usize, C> Eq for BTreeMap<K, V, B, C> {}

impl<'a, K, V, const B: usize, C> IntoIterator for &'a BTreeMap<K, V, B, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, B>;
    fn into_iter(self) -> Iter<'a, K, V, B> {
        self.iter()
    }
}
impl<'a, K, V, const B: usize, C> IntoIterator for &'a mut BTreeMap<K, V, B, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, B>;
    fn into_iter(self) -> IterMut<'a, K, V, B> {
        self.iter_mut()
    }
}
impl<K, V, const B: usize, C> Clone for BTreeMap<K, V, B, C>
where
    K: Clone,
    V: Clone,
    C: Compare<K> + Clone,
{
    fn clone(&self) -> BTreeMap<K, V, B, C> {
        let mut map = BTreeMap::with_comparator(self.cmp.clone());
        for (k, v) in self {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}
impl<K: Ord, V, const B: usize> FromIterator<(K, V)> for BTreeMap<K, V, B, Natural> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> BTreeMap<K, V, B, Natural> {
        let mut map = BTreeMap::new();
        map.extend(iter);
        map
    }
}
impl<K, V, const B: usize, const N: usize> From<[(K, V); N]> for BTreeMap<K, V, B, Natural>
where
    K: Ord,
{
    fn from(arr: [(K, V); N]) -> BTreeMap<K, V, B, Natural> {
        arr.into_iter().collect()
    }
}
impl<K, V, const B: usize, C> Extend<(K, V)> for BTreeMap<K, V, B, C>
where
    C: Compare<K>,
{
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
impl<K, V, const B: usize, C> std::ops::Index<&K> for BTreeMap<K, V, B, C>
where
    C: Compare<K>,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// Panics if the key is not present in the `BTreeMap`.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("no entry found for key"),
        }
    }
}
impl<K: Debug, V: Debug, const B: usize, C> Debug for BTreeMap<K, V, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

use crate::compare::{Compare, Natural};
use crate::node::{Inserted, NodeMut, NodeRef, Split, Tree};
use std::{fmt, fmt::Debug, iter::FusedIterator};

/// Deepest tree the iterators can walk. Each level at least doubles the
/// number of entries, so a map that fits in memory is far shallower.
const MAX_HEIGHT: usize = 64;

// Vector types.
type StkVec<T> = arrayvec::ArrayVec<T, MAX_HEIGHT>;

// Immutable reference iteration.

/// Iterator returned by [`BTreeMap::iter`].
///
/// Keeps the current node, the index of the next entry in it, and a stack of
/// ancestors with the index at which each resumes. Can be restarted with [`Iter::reset`].
pub struct Iter<'a, K, V, const B: usize> {
    root: Option<NodeRef<'a, K, V, B>>,
    node: Option<NodeRef<'a, K, V, B>>,
    index: usize,
    stk: StkVec<(NodeRef<'a, K, V, B>, usize)>,
    len: usize,
    total: usize,
}
impl<'a, K, V, const B: usize> Iter<'a, K, V, B> {
    fn new(root: Option<NodeRef<'a, K, V, B>>, total: usize) -> Self {
        let mut x = Self {
            root,
            node: None,
            index: 0,
            stk: StkVec::new(),
            len: total,
            total,
        };
        x.reset();
        x
    }

    /// Reposition the iterator at the smallest key.
    pub fn reset(&mut self) {
        self.stk.clear();
        self.index = 0;
        self.len = self.total;
        self.node = self.root.map(|root| push_leftmost(&mut self.stk, root));
    }

    /// True once every entry has been returned.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.len == 0
    }
}

/// Descend to the leftmost leaf of `node`, pushing every internal node passed with resume index 0.
fn push_leftmost<'a, K, V, const B: usize>(
    stk: &mut StkVec<(NodeRef<'a, K, V, B>, usize)>,
    mut node: NodeRef<'a, K, V, B>,
) -> NodeRef<'a, K, V, B> {
    while !node.is_leaf() {
        stk.push((node, 0));
        node = node.descend(0);
    }
    node
}

impl<'a, K, V, const B: usize> Iterator for Iter<'a, K, V, B> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let mut node = self.node?;
        loop {
            if self.index < node.len() {
                let kv = node.key_value(self.index);
                self.index += 1;
                if !node.is_leaf() {
                    // Next is the leftmost entry of the subtree right of kv.
                    self.stk.push((node, self.index));
                    node = push_leftmost(&mut self.stk, node.descend(self.index));
                    self.index = 0;
                }
                self.node = Some(node);
                self.len -= 1;
                return Some(kv);
            }
            let (parent, index) = self.stk.pop()?;
            node = parent;
            self.index = index;
            self.node = Some(node);
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K, V, const B: usize> ExactSizeIterator for Iter<'a, K, V, B> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K, V, const B: usize> FusedIterator for Iter<'a, K, V, B> {}

// Mutable reference iteration.

struct StkMut<'a, K, V, const B: usize> {
    k: std::slice::Iter<'a, K>,
    v: std::slice::IterMut<'a, V>,
    c: std::slice::IterMut<'a, Tree<K, V, B>>,
}

/// Iterator returned by [`BTreeMap::iter_mut`].
///
/// Values can be changed in place, keys cannot.
pub struct IterMut<'a, K, V, const B: usize> {
    leaf: Option<(std::slice::Iter<'a, K>, std::slice::IterMut<'a, V>)>,
    stk: StkVec<StkMut<'a, K, V, B>>,
    len: usize,
}
impl<'a, K, V, const B: usize> IterMut<'a, K, V, B> {
    fn new(root: Option<&'a mut Tree<K, V, B>>, len: usize) -> Self {
        let mut x = Self {
            leaf: None,
            stk: StkVec::new(),
            len,
        };
        if let Some(root) = root {
            x.push_tree(root);
        }
        x
    }

    fn push_tree(&mut self, mut tree: &'a mut Tree<K, V, B>) {
        loop {
            let (keys, vals, children) = tree.iter_parts_mut();
            match children {
                None => {
                    self.leaf = Some((keys.iter(), vals.iter_mut()));
                    return;
                }
                Some(children) => {
                    let mut c = children.iter_mut();
                    let first = c.next();
                    self.stk.push(StkMut {
                        k: keys.iter(),
                        v: vals.iter_mut(),
                        c,
                    });
                    match first {
                        Some(ct) => tree = ct,
                        None => return,
                    }
                }
            }
        }
    }
}
impl<'a, K, V, const B: usize> Iterator for IterMut<'a, K, V, B> {
    type Item = (&'a K, &'a mut V);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((keys, vals)) = &mut self.leaf {
                if let (Some(k), Some(v)) = (keys.next(), vals.next()) {
                    self.len -= 1;
                    return Some((k, v));
                }
                self.leaf = None;
            } else if let Some(s) = self.stk.last_mut() {
                if let (Some(k), Some(v)) = (s.k.next(), s.v.next()) {
                    if let Some(ct) = s.c.next() {
                        self.push_tree(ct);
                    }
                    self.len -= 1;
                    return Some((k, v));
                }
                self.stk.pop();
            } else {
                return None;
            }
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}
impl<'a, K, V, const B: usize> ExactSizeIterator for IterMut<'a, K, V, B> {
    fn len(&self) -> usize {
        self.len
    }
}
impl<'a, K, V, const B: usize> FusedIterator for IterMut<'a, K, V, B> {}

/// Iterator returned by [`BTreeMap::values_mut`].
pub struct ValuesMut<'a, K, V, const B: usize>(IterMut<'a, K, V, B>);
impl<'a, K, V, const B: usize> Iterator for ValuesMut<'a, K, V, B> {
    type Item = &'a mut V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K, V, const B: usize> FusedIterator for ValuesMut<'a, K, V, B> {}

/// Iterator returned by [`BTreeMap::values`].
pub struct Values<'a, K, V, const B: usize>(Iter<'a, K, V, B>);
impl<'a, K, V, const B: usize> Iterator for Values<'a, K, V, B> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K, V, const B: usize> FusedIterator for Values<'a, K, V, B> {}

/// Iterator returned by [`BTreeMap::keys`].
pub struct Keys<'a, K, V, const B: usize>(Iter<'a, K, V, B>);
impl<'a, K, V, const B: usize> Iterator for Keys<'a, K, V, B> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
impl<'a, K, V, const B: usize> ExactSizeIterator for Keys<'a, K, V, B> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
impl<'a, K, V, const B: usize> FusedIterator for Keys<'a, K, V, B> {}
