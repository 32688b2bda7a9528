#![cfg(test)]

// Property tests for EntryTable kept inside the crate so they can reach the
// table directly.

use crate::deep_eq::DeepEq;
use crate::entry_table::{EntryTable, Handle};
use proptest::prelude::*;
use std::rc::Rc;

// Every op allocates a fresh `Rc`, so equivalent keys never share identity.
#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, i32),
    InsertNew(Vec<u8>, i32),
    Remove(Vec<u8>),
    Find(Vec<u8>),
    Mutate(Vec<u8>, i32),
    Iterate,
}

fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..3, 0..3)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_key(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        (arb_key(), any::<i32>()).prop_map(|(k, v)| Op::InsertNew(k, v)),
        arb_key().prop_map(Op::Remove),
        arb_key().prop_map(Op::Find),
        (arb_key(), any::<i32>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        Just(Op::Iterate),
    ]
}

// Brute-force reference: a vector of (representative, value, handle) in
// insertion order, searched with the same first-match rule.
struct Model {
    entries: Vec<(Rc<Vec<u8>>, i32, Handle)>,
}

impl Model {
    fn position(&self, k: &Vec<u8>) -> Option<usize> {
        self.entries.iter().position(|(rep, _, _)| **rep == *k)
    }
}

// Property: state-machine equivalence against a linear-scan model.
// Invariants exercised:
// - Uniqueness: len equals the number of distinct key contents stored.
// - First representative wins: the stored key is pointer-identical to the
//   first inserted one, and its handle never changes while it is stored.
// - Insert replaces the value only; insert_new never does.
// - Iteration order equals insertion order of surviving representatives.
// - Removed handles never resolve again.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in proptest::collection::vec(arb_op(), 1..80)) {
        let mut sut: EntryTable<Rc<Vec<u8>>, i32> = EntryTable::new();
        let mut model = Model { entries: Vec::new() };
        let mut dead: Vec<Handle> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let key = Rc::new(k.clone());
                    let (h, old) = sut.insert(key.clone(), v);
                    match model.position(&k) {
                        Some(i) => {
                            let (rep, val, mh) = &mut model.entries[i];
                            prop_assert_eq!(h, *mh);
                            prop_assert_eq!(old, Some(*val));
                            *val = v;
                            let stored = sut.key(h).expect("live handle");
                            prop_assert!(Rc::ptr_eq(stored, rep));
                            prop_assert!(!Rc::ptr_eq(stored, &key));
                        }
                        None => {
                            prop_assert!(old.is_none());
                            model.entries.push((key, v, h));
                        }
                    }
                }
                Op::InsertNew(k, v) => {
                    let (h, fresh) = sut.insert_new(Rc::new(k.clone()), v);
                    match model.position(&k) {
                        Some(i) => {
                            prop_assert!(!fresh);
                            prop_assert_eq!(h, model.entries[i].2);
                            prop_assert_eq!(sut.value(h), Some(&model.entries[i].1));
                        }
                        None => {
                            prop_assert!(fresh);
                            let key = sut.key(h).expect("live handle").clone();
                            model.entries.push((key, v, h));
                        }
                    }
                }
                Op::Remove(k) => {
                    let removed = sut.remove(&Rc::new(k.clone()));
                    match model.position(&k) {
                        Some(i) => {
                            let (rep, val, h) = model.entries.remove(i);
                            let (rk, rv) = removed.expect("model says present");
                            prop_assert!(Rc::ptr_eq(&rk, &rep));
                            prop_assert_eq!(rv, val);
                            dead.push(h);
                        }
                        None => prop_assert!(removed.is_none()),
                    }
                }
                Op::Find(k) => {
                    let found = sut.find(&Rc::new(k.clone()));
                    let expected = model.position(&k).map(|i| model.entries[i].2);
                    prop_assert_eq!(found, expected);
                    prop_assert_eq!(sut.contains_key(&Rc::new(k)), expected.is_some());
                }
                Op::Mutate(k, d) => {
                    if let Some(i) = model.position(&k) {
                        let h = model.entries[i].2;
                        let v = sut.value_mut(h).expect("live handle");
                        *v = v.wrapping_add(d);
                        model.entries[i].1 = model.entries[i].1.wrapping_add(d);
                    }
                }
                Op::Iterate => {
                    let seen: Vec<(Vec<u8>, i32)> =
                        sut.iter().map(|(_, k, v)| ((**k).clone(), *v)).collect();
                    let expected: Vec<(Vec<u8>, i32)> = model
                        .entries
                        .iter()
                        .map(|(k, v, _)| ((**k).clone(), *v))
                        .collect();
                    prop_assert_eq!(seen, expected);
                }
            }

            prop_assert_eq!(sut.len(), model.entries.len());
            prop_assert_eq!(sut.is_empty(), model.entries.is_empty());
            for h in &dead {
                prop_assert!(sut.value(*h).is_none());
            }
            // No two stored keys are equivalent.
            let keys: Vec<&Rc<Vec<u8>>> = sut.iter().map(|(_, k, _)| k).collect();
            for (i, a) in keys.iter().enumerate() {
                for b in &keys[i + 1..] {
                    prop_assert!(!(**a).deep_eq(*b));
                }
            }
        }
    }
}
