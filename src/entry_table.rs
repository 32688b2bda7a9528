//! EntryTable: insertion-ordered storage with stable handles, resolved by
//! deep equality.
//!
//! Both public containers sit on this table. Every lookup scans the live
//! keys in insertion order through [`find_match`], so the first stored
//! member of an equivalence class is always the one found. Entries live in a
//! `SlotMap`; a separate `order` vector records insertion order.

use crate::canonical::find_match;
use crate::deep_eq::DeepEq;
use crate::reentrancy::ScanGuard;
use core::sync::atomic::{AtomicU64, Ordering};
use slotmap::{DefaultKey, SecondaryMap, SlotMap};
use thiserror::Error;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(0);

// Identity of one table instance; never reused within a process.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct TableId(u64);

impl TableId {
    fn next() -> Self {
        Self(NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable identity of a stored representative.
///
/// A handle stays valid for as long as its entry is stored, including across
/// value replacement by an equivalent key. Once the entry is removed the
/// handle never resolves again, even if an equal key is inserted later. A
/// handle only resolves in the collection that issued it; copies of that
/// collection issue their own handles.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    table: TableId,
    slot: DefaultKey,
}

/// Why a [`Handle`] could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("handle belongs to a different collection")]
    WrongMap,
    #[error("handle refers to a removed entry")]
    Removed,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

pub(crate) struct EntryTable<K, V> {
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    order: Vec<DefaultKey>,
    scan: ScanGuard,
    id: TableId,
}

impl<K, V> EntryTable<K, V> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            order: Vec::with_capacity(capacity),
            scan: ScanGuard::new(),
            id: TableId::next(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.slots.clear();
    }

    fn handle(&self, slot: DefaultKey) -> Handle {
        Handle {
            table: self.id,
            slot,
        }
    }

    /// The slot `h` names in this table, or why it names none.
    pub(crate) fn resolve(&self, h: Handle) -> Result<DefaultKey, HandleError> {
        if h.table != self.id {
            return Err(HandleError::WrongMap);
        }
        if !self.slots.contains_key(h.slot) {
            return Err(HandleError::Removed);
        }
        Ok(h.slot)
    }

    pub(crate) fn key(&self, h: Handle) -> Option<&K> {
        let slot = self.resolve(h).ok()?;
        self.slots.get(slot).map(|e| &e.key)
    }

    pub(crate) fn value(&self, h: Handle) -> Option<&V> {
        let slot = self.resolve(h).ok()?;
        self.slots.get(slot).map(|e| &e.value)
    }

    pub(crate) fn value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let slot = self.resolve(h).ok()?;
        self.slots.get_mut(slot).map(|e| &mut e.value)
    }

    pub(crate) fn entry(&self, h: Handle) -> Option<(&K, &V)> {
        let slot = self.resolve(h).ok()?;
        self.slots.get(slot).map(|e| (&e.key, &e.value))
    }

    /// Unlinks an entry. The returned pair is dropped by the caller, after
    /// the table is consistent again.
    pub(crate) fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        let slot = self.resolve(h).ok()?;
        let entry = self.slots.remove(slot)?;
        if let Some(pos) = self.order.iter().position(|&k| k == slot) {
            self.order.remove(pos);
        }
        Some((entry.key, entry.value))
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            order: self.order.iter(),
            slots: &self.slots,
            table: self.id,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let table = self.id;
        let mut by_key: SecondaryMap<DefaultKey, (&K, &mut V)> =
            SecondaryMap::with_capacity(self.slots.len());
        for (k, entry) in self.slots.iter_mut() {
            let Entry { key, value } = entry;
            by_key.insert(k, (&*key, value));
        }
        let items: Vec<_> = self
            .order
            .iter()
            .filter_map(|&slot| {
                by_key
                    .remove(slot)
                    .map(|(key, value)| (Handle { table, slot }, key, value))
            })
            .collect();
        IterMut {
            items: items.into_iter(),
        }
    }

    // Unguarded scan; callers hold a scan token.
    fn locate<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        let live = self
            .order
            .iter()
            .filter_map(|&k| self.slots.get(k).map(|e| (k, &e.key)));
        find_match(live, q)
    }

    pub(crate) fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        let _g = self.scan.read();
        self.locate(q).map(|slot| self.handle(slot))
    }

    pub(crate) fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.find(q).is_some()
    }

    /// Canonicalizes `key` and stores `value` under the representative.
    ///
    /// When an equivalent key is already stored, that key and its handle are
    /// kept, `key` is dropped, and the previous value is returned. Otherwise
    /// `(key, value)` is appended as a new representative.
    pub(crate) fn insert(&mut self, key: K, value: V) -> (Handle, Option<V>)
    where
        K: DeepEq,
    {
        let found = {
            let _g = self.scan.write();
            self.locate(&key)
        };
        if let Some(k) = found {
            if let Some(entry) = self.slots.get_mut(k) {
                let old = core::mem::replace(&mut entry.value, value);
                return (self.handle(k), Some(old));
            }
        }
        let k = self.slots.insert(Entry { key, value });
        self.order.push(k);
        (self.handle(k), None)
    }

    /// Appends a new representative only when no equivalent key is stored.
    /// Returns `false` (dropping `key` and `value`) otherwise.
    pub(crate) fn insert_new(&mut self, key: K, value: V) -> (Handle, bool)
    where
        K: DeepEq,
    {
        let found = {
            let _g = self.scan.write();
            self.locate(&key)
        };
        match found {
            Some(k) => (self.handle(k), false),
            None => {
                let k = self.slots.insert(Entry { key, value });
                self.order.push(k);
                (self.handle(k), true)
            }
        }
    }

    pub(crate) fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        let found = {
            let _g = self.scan.write();
            self.locate(q)
        };
        self.remove_handle(self.handle(found?))
    }
}

/// Iterator over entries in insertion order.
pub(crate) struct Iter<'a, K, V> {
    order: core::slice::Iter<'a, DefaultKey>,
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    table: TableId,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for &slot in self.order.by_ref() {
            if let Some(e) = self.slots.get(slot) {
                let h = Handle {
                    table: self.table,
                    slot,
                };
                return Some((h, &e.key, &e.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.order.len()))
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            slots: self.slots,
            table: self.table,
        }
    }
}

/// Mutable iterator over entries in insertion order.
pub(crate) struct IterMut<'a, K, V> {
    items: std::vec::IntoIter<(Handle, &'a K, &'a mut V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Handle, &'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

/// Owning iterator over entries in insertion order.
pub(crate) struct IntoIter<K, V> {
    order: std::vec::IntoIter<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for k in self.order.by_ref() {
            if let Some(e) = self.slots.remove(k) {
                return Some((e.key, e.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slots.len(), Some(self.slots.len()))
    }
}

impl<K, V> IntoIterator for EntryTable<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            order: self.order.into_iter(),
            slots: self.slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn keys<V>(t: &EntryTable<Value, V>) -> Vec<Value> {
        t.iter().map(|(_, k, _)| k.clone()).collect()
    }

    /// Invariant: an equivalent key keeps the first representative and its
    /// handle; only the value changes.
    #[test]
    fn equivalent_insert_replaces_value_only() {
        let mut t: EntryTable<Value, &str> = EntryTable::new();
        let (h1, old) = t.insert(json!({"a": 1, "b": [1, 2]}), "first");
        assert!(old.is_none());
        let (h2, old) = t.insert(json!({"b": [1, 2], "a": 1.0}), "second");
        assert_eq!(h1, h2);
        assert_eq!(old, Some("first"));
        assert_eq!(t.len(), 1);
        assert_eq!(t.value(h1), Some(&"second"));
        // The stored key is still the first one (integer `1`, not `1.0`).
        assert_eq!(t.key(h1), Some(&json!({"a": 1, "b": [1, 2]})));
    }

    /// Invariant: `insert_new` never touches an existing entry.
    #[test]
    fn insert_new_keeps_existing_value() {
        let mut t: EntryTable<Value, i32> = EntryTable::new();
        let (h, fresh) = t.insert_new(json!([1]), 1);
        assert!(fresh);
        let (h2, fresh) = t.insert_new(json!([1.0]), 2);
        assert!(!fresh);
        assert_eq!(h, h2);
        assert_eq!(t.value(h), Some(&1));
    }

    /// Invariant: iteration follows insertion order, and removals do not
    /// disturb the relative order of the rest.
    #[test]
    fn iteration_order_survives_removal() {
        let mut t: EntryTable<Value, ()> = EntryTable::new();
        for v in [json!("a"), json!("b"), json!("c"), json!("d")] {
            t.insert(v, ());
        }
        assert!(t.remove(&json!("b")).is_some());
        t.insert(json!("e"), ());
        assert_eq!(keys(&t), vec![json!("a"), json!("c"), json!("d"), json!("e")]);
    }

    /// Invariant: a handle does not resolve after removal, even when an
    /// equivalent key is inserted again.
    #[test]
    fn stale_handle_does_not_alias_reinserted_key() {
        let mut t: EntryTable<Value, i32> = EntryTable::new();
        let (h1, _) = t.insert(json!({"k": 1}), 1);
        let (k, v) = t.remove_handle(h1).expect("present");
        assert_eq!((k, v), (json!({"k": 1}), 1));
        let (h2, _) = t.insert(json!({"k": 1}), 2);
        assert_ne!(h1, h2);
        assert!(t.value(h1).is_none());
        assert_eq!(t.value(h2), Some(&2));
        assert!(t.remove_handle(h1).is_none());
    }

    /// Invariant: `iter_mut` visits entries in order and writes are visible.
    #[test]
    fn iter_mut_in_order() {
        let mut t: EntryTable<Value, i32> = EntryTable::new();
        for (i, v) in [json!(3), json!(1), json!(2)].into_iter().enumerate() {
            t.insert(v, i as i32);
        }
        t.remove(&json!(1));
        t.insert(json!(9), 7);
        let seen: Vec<Value> = t
            .iter_mut()
            .map(|(_, k, v)| {
                *v *= 10;
                k.clone()
            })
            .collect();
        assert_eq!(seen, vec![json!(3), json!(2), json!(9)]);
        let vals: Vec<i32> = t.iter().map(|(_, _, v)| *v).collect();
        assert_eq!(vals, vec![0, 20, 70]);
    }

    #[test]
    fn into_iter_yields_owned_pairs_in_order() {
        let mut t: EntryTable<String, u8> = EntryTable::new();
        t.insert("x".to_string(), 1);
        t.insert("y".to_string(), 2);
        t.insert("x".to_string(), 3);
        let pairs: Vec<(String, u8)> = t.into_iter().collect();
        assert_eq!(pairs, vec![("x".to_string(), 3), ("y".to_string(), 2)]);
    }

    #[test]
    fn len_clear_and_borrowed_lookup() {
        let mut t: EntryTable<String, u8> = EntryTable::new();
        assert!(t.is_empty());
        t.insert("hello".to_string(), 1);
        assert!(t.contains_key("hello"));
        assert!(!t.contains_key("world"));
        assert_eq!(t.len(), 1);
        t.clear();
        assert!(t.is_empty());
        assert!(t.find("hello").is_none());
    }

    /// Invariant: a lookup whose `DeepEq` performs another lookup on the
    /// same table completes; reads never see a mutation in progress.
    #[test]
    fn nested_lookup_from_deep_eq_is_allowed() {
        struct Nested {
            id: u32,
            table: *const EntryTable<Nested, ()>,
        }
        impl DeepEq for Nested {
            fn deep_eq(&self, other: &Self) -> bool {
                if !other.table.is_null() {
                    let inner = Nested {
                        id: self.id,
                        table: core::ptr::null(),
                    };
                    // SAFETY: the table is only read while the outer lookup
                    // holds a shared borrow of it.
                    assert!(unsafe { (*other.table).contains_key(&inner) });
                }
                self.id == other.id
            }
        }

        let mut t: EntryTable<Nested, ()> = EntryTable::new();
        t.insert(
            Nested {
                id: 1,
                table: core::ptr::null(),
            },
            (),
        );
        let t = t;
        let query = Nested {
            id: 2,
            table: &t as *const _,
        };
        assert!(t.find(&query).is_none());
    }

    /// Invariant: handles only resolve in the table that issued them.
    #[test]
    fn foreign_handles_do_not_resolve() {
        let mut a: EntryTable<Value, i32> = EntryTable::new();
        let mut b: EntryTable<Value, i32> = EntryTable::new();
        let (ha, _) = a.insert(json!("k"), 1);
        let (hb, _) = b.insert(json!("k"), 2);
        assert_ne!(ha, hb);
        assert_eq!(b.resolve(ha), Err(HandleError::WrongMap));
        assert!(b.key(ha).is_none());
        assert!(b.value_mut(ha).is_none());
        assert!(b.remove_handle(ha).is_none());
        assert_eq!(b.value(hb), Some(&2));

        a.remove(&json!("k"));
        assert_eq!(a.resolve(ha), Err(HandleError::Removed));
    }
}
