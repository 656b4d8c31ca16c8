use std::cmp::Ordering;

/// Three-way key comparator supplied to [`BTreeMap::with_comparator`](crate::gb::BTreeMap::with_comparator).
///
/// `compare(probe, stored)` returns [`Ordering::Less`] if `probe` sorts before `stored`.
/// A node search stops at the first stored key for which the result is not `Greater`,
/// so the comparator must be a total order, consistent for the lifetime of the map.
///
/// Any `Fn(&K, &K) -> Ordering` closure is a comparator:
///
/// ```
///     use btree_lite::BTreeMap;
///     let mut m = BTreeMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
///     m.insert(1, "one");
///     m.insert(2, "two");
///     assert_eq!(m.first_key_value(), Some((&2, &"two")));
/// ```
pub trait Compare<K: ?Sized> {
    /// Compare probe key `a` with stored key `b`.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Comparator using the [`Ord`] implementation of the key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl<K: Ord + ?Sized> Compare<K> for Natural {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}
