#![deny(missing_docs)]

//! This crate implements an in-memory ordered map, [BTreeMap], stored as a B-tree.
//!
//! The order of the tree (the minimum branching factor `B`) is a generic constant, and the key order is
//! given by a [Compare] value supplied when the map is created, rather than being fixed by [Ord].
//!
//! Most of the implementation is in the [gb] module, see [gb::BTreeMap].
//!
//! # Example
//!
//! ```
//!     use btree_lite::BTreeMap;
//!     let mut mymap = BTreeMap::new();
//!     mymap.insert("England", "London");
//!     mymap.insert("France", "Paris");
//!     println!("The capital of France is {}", mymap[&"France"]);
//!
//!     let mut it = mymap.iter();
//!     assert_eq!(it.next(), Some((&"England", &"London")));
//!     it.reset();
//!     assert_eq!(it.count(), 2);
//! ```
//!
//! Entries that need explicit teardown can be handed to a closure when the map is cleared:
//!
//! ```
//!     use btree_lite::BTreeMap;
//!     let mut m = BTreeMap::new();
//!     m.extend((0..100).map(|i| (i, i * 2)));
//!     let mut total = 0;
//!     m.dealloc_with(|_k, v| total += v);
//!     assert_eq!(total, 9900);
//! ```
//!
//!# Features
//!
//! This crate supports the following cargo features:
//! - `tracing` : emits trace events when the root is allocated, split, collapsed or freed.
//! - `unsafe-optim` : uses unsafe code for extra optimisation.

/// Module with version of BTreeMap that allows B to be specified as generic constant.
pub mod gb;

/// Key comparators.
pub mod compare;

mod node;
mod vecs;

pub use compare::{Compare, Natural};

/// Default B value, nodes hold between `DB-1` and `2*DB-1` entries.
pub const DB: usize = 6;

/// BTreeMap with default order [DB], ordered by `C` (by default the [Ord] of the key).
pub type BTreeMap<K, V, C = Natural> = gb::BTreeMap<K, V, DB, C>;

/// Iterator returned by [BTreeMap::iter].
pub type Iter<'a, K, V> = gb::Iter<'a, K, V, DB>;

/// Iterator returned by [BTreeMap::iter_mut].
pub type IterMut<'a, K, V> = gb::IterMut<'a, K, V, DB>;

/// Iterator returned by [BTreeMap::keys].
pub type Keys<'a, K, V> = gb::Keys<'a, K, V, DB>;

/// Iterator returned by [BTreeMap::values].
pub type Values<'a, K, V> = gb::Values<'a, K, V, DB>;

/// Iterator returned by [BTreeMap::values_mut].
pub type ValuesMut<'a, K, V> = gb::ValuesMut<'a, K, V, DB>;

// Tests.

/* mimalloc cannot be used with miri */
#[cfg(all(test, not(miri)))]
use mimalloc::MiMalloc;

#[cfg(all(test, not(miri)))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[cfg(test)]
mod mytests;

#[cfg(test)]
mod proptests;
