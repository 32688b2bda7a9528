//! DeepEqualMap: a map whose keys are compared by deep structural equality.

use crate::deep_eq::DeepEq;
use crate::entry_table::{self, EntryTable, Handle, HandleError};
use crate::merge::{MergeConflict, MergeValue};
use core::fmt;
use log::{debug, trace};
use serde::Serialize;

/// A map keyed by deep structural equality.
///
/// Two keys are the same key when they are [`DeepEq`]-equal, regardless of
/// where they live. The first key stored for an equivalence class stays the
/// representative; later equivalent keys only replace the value. Iteration
/// follows insertion order.
///
/// Every operation compares against every stored key, so lookups are linear
/// in the number of entries. Keys are never hashed: a key with shared
/// interior mutability that changes after insertion is simply compared by
/// its new contents on the next lookup.
///
/// ```
/// use deep_equal_collections::DeepEqualMap;
/// use serde_json::json;
///
/// let mut m = DeepEqualMap::new();
/// m.set(json!({"name": "Leandro", "age": 29}), "first value loses")
///     .set(json!({"age": 29, "name": "Leandro"}), "second value wins");
///
/// assert_eq!(m.len(), 1);
/// assert_eq!(m.get(&json!({"name": "Leandro", "age": 29})), Some(&"second value wins"));
/// ```
pub struct DeepEqualMap<K, V> {
    table: EntryTable<K, V>,
}

impl<K, V> DeepEqualMap<K, V> {
    pub fn new() -> Self {
        Self {
            table: EntryTable::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: EntryTable::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Entries in insertion order, with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let doomed: Vec<Handle> = self
            .table
            .iter_mut()
            .filter_map(|(h, k, v)| (!f(k, v)).then_some(h))
            .collect();
        for h in doomed {
            self.table.remove_handle(h);
        }
    }
}

impl<K: DeepEq, V> DeepEqualMap<K, V> {
    /// Stores `value` under the representative of `key`'s equivalence class
    /// and returns the map for chaining.
    ///
    /// If an equivalent key is already stored it is kept and `key` is
    /// dropped; otherwise `key` becomes a new representative at the end of
    /// the iteration order.
    pub fn set(&mut self, key: K, value: V) -> &mut Self {
        self.table.insert(key, value);
        self
    }

    /// Like [`set`](Self::set), returning the value that was replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.table.insert(key, value).1
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.find(key).and_then(|h| self.table.value(h))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        let h = self.table.find(key)?;
        self.table.value_mut(h)
    }

    /// Returns the stored representative together with its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.find(key).and_then(|h| self.table.entry(h))
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.contains_key(key)
    }

    /// Removes the entry equivalent to `key`. Returns whether one existed.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.remove(key).is_some()
    }

    /// Removes the entry equivalent to `key`, returning the stored
    /// representative and its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.remove(key)
    }

    /// Handle of the representative equivalent to `key`.
    ///
    /// Handles survive value replacement, so two lookups with different but
    /// equivalent keys return the same handle.
    pub fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.find(key)
    }

    /// Merges `other` into this map, entry by entry in `other`'s order.
    ///
    /// - A key with no equivalent here is added with a clone of its value.
    /// - A key whose stored value is mergeable (see [`MergeValue`]) gets a
    ///   merged copy of the stored value, kept under the existing
    ///   representative.
    /// - Otherwise the merge stops with a [`MergeConflict`] holding JSON
    ///   snapshots of the key and both values. Entries merged before the
    ///   conflicting key stay merged.
    ///
    /// Keys and values are cloned shallowly: an `Rc` is shared, not copied.
    pub fn merge(&mut self, other: &Self) -> Result<&mut Self, MergeConflict>
    where
        K: Clone + Serialize,
        V: MergeValue + Clone + Serialize,
    {
        self.merge_with(other, |key, this_value, other_value| {
            MergeConflict::new(key, this_value, other_value)
        })
    }

    /// Like [`merge`](Self::merge), with the conflict built by
    /// `on_conflict` from the incoming key, the stored value and the
    /// incoming value. Keys and values need not be serializable; see
    /// [`MergeConflict::from_debug`].
    pub fn merge_with<F>(
        &mut self,
        other: &Self,
        mut on_conflict: F,
    ) -> Result<&mut Self, MergeConflict>
    where
        K: Clone,
        V: MergeValue + Clone,
        F: FnMut(&K, &V, &V) -> MergeConflict,
    {
        trace!("merging {} entries into a map of {}", other.len(), self.len());
        for (_, key, other_value) in other.table.iter() {
            let existing = self
                .table
                .find(key)
                .and_then(|h| self.table.value(h).map(|v| (h, v)));
            let Some((h, this_value)) = existing else {
                trace!("appending a key missing from the receiving map");
                self.table.insert(key.clone(), other_value.clone());
                continue;
            };
            let merged = match this_value.merge_copy(other_value) {
                Some(Ok(merged)) => merged,
                Some(Err(nested)) => {
                    debug!("nested merge aborted: {nested}");
                    return Err(nested);
                }
                None => {
                    let conflict = on_conflict(key, this_value, other_value);
                    debug!("merge aborted: {conflict}");
                    return Err(conflict);
                }
            };
            trace!("merged value under an existing key");
            if let Some(slot) = self.table.value_mut(h) {
                *slot = merged;
            }
        }
        Ok(self)
    }
}

impl Handle {
    /// The representative key this handle refers to.
    ///
    /// Fails with [`HandleError::WrongMap`] when `map` did not issue the
    /// handle and [`HandleError::Removed`] once the entry is gone.
    pub fn key<'a, K, V>(&self, map: &'a DeepEqualMap<K, V>) -> Result<&'a K, HandleError> {
        map.table.resolve(*self)?;
        map.table.key(*self).ok_or(HandleError::Removed)
    }

    pub fn value<'a, K, V>(&self, map: &'a DeepEqualMap<K, V>) -> Result<&'a V, HandleError> {
        map.table.resolve(*self)?;
        map.table.value(*self).ok_or(HandleError::Removed)
    }

    pub fn value_mut<'a, K, V>(
        &self,
        map: &'a mut DeepEqualMap<K, V>,
    ) -> Result<&'a mut V, HandleError> {
        map.table.resolve(*self)?;
        map.table.value_mut(*self).ok_or(HandleError::Removed)
    }
}

impl<K, V> MergeValue for DeepEqualMap<K, V>
where
    K: DeepEq + Clone + Serialize,
    V: MergeValue + Clone + Serialize,
{
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
        let mut copy = self.clone();
        if let Err(conflict) = copy.merge(other) {
            return Some(Err(conflict));
        }
        Some(Ok(copy))
    }
}

impl<K: DeepEq, V: DeepEq> DeepEq for DeepEqualMap<K, V> {
    fn deep_eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
            || (self.len() == other.len()
                && self
                    .iter()
                    .all(|(k, v)| other.get(k).is_some_and(|w| v.deep_eq(w))))
    }
}

/// Order-insensitive deep equality of the entries.
impl<K: DeepEq, V: DeepEq> PartialEq for DeepEqualMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl<K, V> Default for DeepEqualMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// Copies are rebuilt through `set` so the copy is canonical even if stored
// keys drifted into equality after insertion.
impl<K: DeepEq + Clone, V: Clone> Clone for DeepEqualMap<K, V> {
    fn clone(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for DeepEqualMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: DeepEq, V> FromIterator<(K, V)> for DeepEqualMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        map.extend(iter);
        map
    }
}

impl<K: DeepEq, V> Extend<(K, V)> for DeepEqualMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K: DeepEq, V, const N: usize> From<[(K, V); N]> for DeepEqualMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Iterator over `(&K, &V)` in insertion order.
pub struct Iter<'a, K, V> {
    inner: entry_table::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Iterator over `(&K, &mut V)` in insertion order.
pub struct IterMut<'a, K, V> {
    inner: entry_table::IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Owning iterator over `(K, V)` in insertion order.
pub struct IntoIter<K, V> {
    inner: entry_table::IntoIter<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> IntoIterator for DeepEqualMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a DeepEqualMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut DeepEqualMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
