use crate::gb::BTreeMap;
use proptest::collection::vec as pvec;
use proptest::prelude::*;
use std::collections::BTreeMap as StdBTreeMap;
use test_strategy::proptest;

#[derive(Debug, Clone)]
enum Operation {
    Insert { key: u16, value: u32 },
    Remove(u16),
    Get(u16),
    PopFirst,
    Iter { skip: usize },
}

// Inserts outweigh removes so that maps grow several levels deep on average.
// Keys come from a small range so removes and overwrites usually hit.
fn op_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (0..1000u16, any::<u32>()).prop_map(|(key, value)| Operation::Insert { key, value }),
        3 => (0..1000u16).prop_map(Operation::Remove),
        2 => (0..1000u16).prop_map(Operation::Get),
        1 => Just(Operation::PopFirst),
        1 => (0..64usize).prop_map(|skip| Operation::Iter { skip }),
    ]
}

fn execute_operation<const B: usize>(
    std_btree: &mut StdBTreeMap<u16, u32>,
    btree: &mut BTreeMap<u16, u32, B>,
    op: Operation,
) {
    match op {
        Operation::Insert { key, value } => {
            assert_eq!(btree.insert(key, value), std_btree.insert(key, value));
        }
        Operation::Remove(key) => {
            assert_eq!(btree.remove(&key), std_btree.remove(&key));
        }
        Operation::Get(key) => {
            assert_eq!(btree.get(&key), std_btree.get(&key));
        }
        Operation::PopFirst => {
            assert_eq!(btree.pop_first(), std_btree.pop_first());
        }
        Operation::Iter { skip } => {
            // A partly consumed iterator resumes from the same place after reset.
            let mut it = btree.iter();
            assert!(it.by_ref().take(skip).eq(std_btree.iter().take(skip)));
            it.reset();
            assert!(it.eq(std_btree.iter()));
        }
    }
    btree.check();
    assert_eq!(btree.len(), std_btree.len());
    assert_eq!(btree.first_key_value(), std_btree.first_key_value());
    assert_eq!(btree.last_key_value(), std_btree.last_key_value());
}

fn run_ops<const B: usize>(ops: Vec<Operation>) {
    let mut btree = BTreeMap::<u16, u32, B>::new();
    let mut std_btree = StdBTreeMap::new();
    for op in ops {
        execute_operation(&mut std_btree, &mut btree, op);
    }
    assert!(btree.iter().eq(std_btree.iter()));
    let mut drained = Vec::new();
    btree.dealloc_with(|k, v| drained.push((k, v)));
    drained.sort_unstable();
    assert!(drained.into_iter().eq(std_btree.into_iter()));
}

#[proptest(cases = 32)]
fn ops_order_2(#[strategy(pvec(op_strategy(), 100..3_000))] ops: Vec<Operation>) {
    run_ops::<2>(ops);
}

#[proptest(cases = 32)]
fn ops_order_3(#[strategy(pvec(op_strategy(), 100..3_000))] ops: Vec<Operation>) {
    run_ops::<3>(ops);
}

#[proptest(cases = 32)]
fn ops_order_4(#[strategy(pvec(op_strategy(), 100..3_000))] ops: Vec<Operation>) {
    run_ops::<4>(ops);
}

#[proptest(cases = 32)]
fn ops_order_6(#[strategy(pvec(op_strategy(), 100..3_000))] ops: Vec<Operation>) {
    run_ops::<6>(ops);
}

#[proptest(cases = 16)]
fn ops_order_11(#[strategy(pvec(op_strategy(), 100..3_000))] ops: Vec<Operation>) {
    run_ops::<11>(ops);
}

#[proptest]
fn sorted_after_inserts(#[strategy(pvec(any::<i64>(), 0..500))] keys: Vec<i64>) {
    let mut btree = BTreeMap::<i64, (), 2>::new();
    for k in &keys {
        btree.insert(*k, ());
    }
    btree.check();
    let mut expected = keys;
    expected.sort_unstable();
    expected.dedup();
    prop_assert!(btree.keys().eq(expected.iter()));
}

#[proptest]
fn remove_all_empties(#[strategy(pvec(0..200u8, 1..400))] keys: Vec<u8>) {
    let mut btree = BTreeMap::<u8, u8, 3>::new();
    for k in &keys {
        btree.insert(*k, *k);
    }
    for k in &keys {
        btree.remove(k);
        btree.check();
    }
    prop_assert!(btree.is_empty());
    prop_assert_eq!(btree.height(), None);
    prop_assert!(btree.iter().is_done());
}
