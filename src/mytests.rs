use crate::*;
use std::cell::Cell;
use std::rc::Rc;

type Map<const B: usize> = gb::BTreeMap<u32, u32, B>;

#[test]
fn empty_map_test() {
    let mut m = BTreeMap::<u32, u32>::new();
    assert!(m.is_empty());
    assert_eq!(m.height(), None);
    assert_eq!(m.get(&7), None);
    assert_eq!(m.remove(&7), None);
    assert_eq!(m.first_key_value(), None);
    assert_eq!(m.pop_first(), None);
    let mut it = m.iter();
    assert!(it.is_done());
    assert_eq!(it.next(), None);
    m.check();
}

#[test]
fn sequential_insert_test() {
    let mut m = BTreeMap::new();
    for i in 0..512u32 {
        assert_eq!(m.insert(i, i * 10), None);
    }
    m.check();
    assert_eq!(m.len(), 512);
    assert_eq!(m.get(&255), Some(&2550));
    assert_eq!(m.get(&512), None);
    let keys: Vec<u32> = m.keys().copied().collect();
    assert_eq!(keys, (0..512).collect::<Vec<_>>());
    assert_eq!(m.first_key_value(), Some((&0, &0)));
    assert_eq!(m.last_key_value(), Some((&511, &5110)));
}

#[test]
fn remove_evens_test() {
    let mut m = BTreeMap::new();
    for i in 0..4096u32 {
        m.insert(i, i);
    }
    for i in (0..4096u32).step_by(2) {
        assert_eq!(m.remove(&i), Some(i));
        if i % 256 == 0 {
            m.check();
        }
    }
    m.check();
    assert_eq!(m.len(), 2048);
    for i in (0..4096u32).step_by(2) {
        assert!(!m.contains_key(&i));
    }
    let keys: Vec<u32> = m.keys().copied().collect();
    assert_eq!(keys, (1..4096).step_by(2).collect::<Vec<_>>());
}

#[test]
fn reverse_insert_test() {
    let mut m = Map::<3>::new();
    for i in (0..1000).rev() {
        m.insert(i, i);
    }
    m.check();
    assert!(m.iter().map(|(k, _)| *k).eq(0..1000));
}

#[test]
fn single_entry_test() {
    let mut m = BTreeMap::new();
    m.insert(42u32, "x");
    assert_eq!(m.height(), Some(0));
    assert_eq!(m.remove(&42), Some("x"));
    assert!(m.is_empty());
    assert_eq!(m.height(), None);
    assert_eq!(m.get(&42), None);
    let mut it = m.iter();
    assert!(it.is_done());
    assert_eq!(it.next(), None);
    m.check();
}

#[test]
fn root_collapse_test() {
    fn run<const B: usize>() {
        let n = 2 * (2 * B as u32 - 1) + 1;
        let mut m = Map::<B>::new();
        for i in 0..n {
            m.insert(i, i);
        }
        assert!(m.height().unwrap() >= 1);
        for i in 1..n {
            m.remove(&i);
            m.check();
        }
        assert_eq!(m.len(), 1);
        assert_eq!(m.height(), Some(0));
        assert_eq!(m.iter().next(), Some((&0, &0)));
    }
    run::<2>();
    run::<3>();
    run::<6>();
}

#[test]
fn remove_missing_test() {
    let mut m = Map::<2>::new();
    for i in (0..100).map(|i| i * 2) {
        m.insert(i, i);
    }
    let before: Vec<_> = m.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(m.remove(&51), None);
    assert_eq!(m.remove(&1000), None);
    assert_eq!(m.remove(&10), Some(10));
    assert_eq!(m.remove(&10), None);
    m.check();
    assert_eq!(m.len(), before.len() - 1);
}

#[test]
fn overwrite_test() {
    let mut m = Map::<4>::new();
    for i in 0..100 {
        m.insert(i, i);
    }
    for i in 0..100 {
        assert_eq!(m.insert(i, i + 1), Some(i));
    }
    assert_eq!(m.len(), 100);
    assert!(m.iter().all(|(k, v)| *v == k + 1));
    m.check();
}

#[test]
fn overwrite_keeps_stored_key_test() {
    // Keys compare equal on the first field only.
    let mut m = gb::BTreeMap::<(u32, &str), u32, 3, _>::with_comparator(
        |a: &(u32, &str), b: &(u32, &str)| a.0.cmp(&b.0),
    );
    m.insert((1, "first"), 1);
    assert_eq!(m.insert((1, "second"), 2), Some(1));
    assert_eq!(m.first_key_value(), Some((&(1, "first"), &2)));
}

#[test]
fn iter_reset_test() {
    let mut m = Map::<2>::new();
    for i in 0..50 {
        m.insert(i, i);
    }
    let mut it = m.iter();
    assert_eq!(it.len(), 50);
    for i in 0..20 {
        assert_eq!(it.next(), Some((&i, &i)));
    }
    assert_eq!(it.len(), 30);
    it.reset();
    assert_eq!(it.len(), 50);
    assert!(it.by_ref().map(|(k, _)| *k).eq(0..50));
    assert!(it.is_done());
    assert_eq!(it.next(), None);
    assert_eq!(it.next(), None);
    it.reset();
    assert_eq!(it.next(), Some((&0, &0)));
}

#[test]
fn iter_every_shape_test() {
    // Every size from empty to a few levels deep.
    let mut m = Map::<2>::new();
    for n in 0..200 {
        assert!(m.iter().map(|(k, _)| *k).eq(0..n));
        assert_eq!(m.iter().len(), n as usize);
        m.insert(n, n);
    }
}

#[test]
fn custom_comparator_test() {
    let mut m = gb::BTreeMap::<u32, u32, 3, _>::with_comparator(|a: &u32, b: &u32| b.cmp(a));
    for i in 0..100 {
        m.insert(i, i);
    }
    m.check();
    assert!(m.keys().copied().eq((0..100).rev()));
    assert_eq!(m.first_key_value(), Some((&99, &99)));
    assert_eq!(m.remove(&50), Some(50));
    assert_eq!(m.get(&50), None);
    assert_eq!(m.get(&49), Some(&49));
    m.check();
}

#[test]
fn iter_mut_test() {
    let mut m = Map::<3>::new();
    for i in 0..300 {
        m.insert(i, i);
    }
    for (k, v) in m.iter_mut() {
        *v += k;
    }
    for v in m.values_mut() {
        *v += 1;
    }
    assert!(m.iter().all(|(k, v)| *v == 2 * k + 1));
    if let Some(v) = m.get_mut(&7) {
        *v = 0;
    }
    assert_eq!(m[&7], 0);
    assert_eq!(m.iter_mut().len(), 300);
}

#[test]
fn pop_first_test() {
    let mut m = Map::<2>::new();
    for i in (0..100).rev() {
        m.insert(i, i);
    }
    for i in 0..100 {
        assert_eq!(m.pop_first(), Some((i, i)));
        m.check();
    }
    assert_eq!(m.pop_first(), None);
    assert_eq!(m.height(), None);
}

#[test]
fn clear_with_test() {
    let mut m = Map::<2>::new();
    for i in 0..100 {
        m.insert(i, i);
    }
    let mut seen = Vec::new();
    m.clear_with(|k, v| {
        assert_eq!(k, v);
        seen.push(k);
    });
    seen.sort_unstable();
    assert_eq!(seen, (0..100).collect::<Vec<_>>());
    assert!(m.is_empty());
    assert_eq!(m.height(), None);
    m.insert(5, 5);
    assert_eq!(m.len(), 1);
    m.check();
}

#[test]
fn dealloc_with_test() {
    let m = BTreeMap::<u32, u32>::new();
    let mut calls = 0;
    m.dealloc_with(|_, _| calls += 1);
    assert_eq!(calls, 0);

    let mut m = Map::<3>::new();
    m.extend((0..1000).map(|i| (i, i)));
    let mut sum = 0;
    m.dealloc_with(|k, _| sum += k);
    assert_eq!(sum, 999 * 1000 / 2);
}

/// Counts live instances, to check every value is dropped exactly once.
struct Tracked(Rc<Cell<usize>>);

impl Tracked {
    fn new(live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Tracked(live.clone())
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[test]
fn drop_test() {
    let live = Rc::new(Cell::new(0));
    {
        let mut m = Map::<2>::new();
        let mut m2 = gb::BTreeMap::<u32, Tracked, 2>::new();
        for i in 0..500 {
            m.insert(i, i);
            m2.insert(i, Tracked::new(&live));
        }
        assert_eq!(live.get(), 500);
        for i in 0..250 {
            m2.remove(&(i * 2));
        }
        assert_eq!(live.get(), 250);
        m2.insert(1, Tracked::new(&live));
        assert_eq!(live.get(), 250);
    }
    assert_eq!(live.get(), 0);

    let mut m = gb::BTreeMap::<u32, Tracked, 4>::new();
    for i in 0..100 {
        m.insert(i, Tracked::new(&live));
    }
    m.clear();
    assert_eq!(live.get(), 0);
}

#[test]
fn trait_test() {
    let m: BTreeMap<u32, u32> = (0..20).map(|i| (i, i)).collect();
    let c = m.clone();
    assert_eq!(m, c);
    c.check();
    let mut d = BTreeMap::from([(1u32, 1u32), (0, 0)]);
    assert_ne!(m, d);
    d.extend((2..20).map(|i| (i, i)));
    assert_eq!(m, d);
    assert_eq!(format!("{:?}", BTreeMap::from([(1, 2), (3, 4)])), "{1: 2, 3: 4}");
    assert_eq!(BTreeMap::<u32, u32>::default().len(), 0);
    let mut n = 0;
    for (k, v) in &m {
        assert_eq!(k, v);
        n += 1;
    }
    assert_eq!(n, 20);
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn index_missing_test() {
    let m = BTreeMap::from([(1, 1)]);
    let _v = m[&2];
}

#[test]
fn values_test() {
    let m = Map::<2>::from([(3, 30), (1, 10), (2, 20)]);
    assert!(m.values().copied().eq([10, 20, 30]));
    assert_eq!(m.get_key_value(&2), Some((&2, &20)));
}

#[test]
fn various_test() {
    let mut m = Map::<2>::new();
    let mut t = std::collections::BTreeMap::new();
    let mut x: u32 = 12345;
    for _ in 0..5000 {
        // xorshift
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        let k = x % 600;
        if x % 3 == 0 {
            assert_eq!(m.remove(&k), t.remove(&k));
        } else {
            assert_eq!(m.insert(k, x), t.insert(k, x));
        }
    }
    m.check();
    assert!(m.iter().eq(t.iter()));
}
