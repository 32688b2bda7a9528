//! DeepEqualSet: a set whose members are compared by deep structural
//! equality. Backed by an entry table with unit values.

use crate::deep_eq::DeepEq;
use crate::entry_table::{self, EntryTable};
use crate::merge::{MergeConflict, MergeValue};
use core::fmt;
use log::trace;

/// A set of values unique under [`DeepEq`].
///
/// Adding a value equivalent to a member is a no-op: the first member of an
/// equivalence class stays stored. Iteration follows insertion order.
///
/// ```
/// use deep_equal_collections::DeepEqualSet;
///
/// let mut s = DeepEqualSet::new();
/// s.add(vec![1i32, 2]).add(vec![1, 2]).add(vec![2, 1]);
/// assert_eq!(s.len(), 2);
/// assert!(s.has(&vec![2, 1]));
/// ```
pub struct DeepEqualSet<T> {
    table: EntryTable<T, ()>,
}

impl<T> DeepEqualSet<T> {
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

    /// Members in insertion order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<T: DeepEq> DeepEqualSet<T> {
    /// Adds `value` unless an equivalent member exists; returns the set for
    /// chaining.
    pub fn add(&mut self, value: T) -> &mut Self {
        self.table.insert_new(value, ());
        self
    }

    /// Adds `value` unless an equivalent member exists. Returns whether it
    /// was added.
    pub fn insert(&mut self, value: T) -> bool {
        self.table.insert_new(value, ()).1
    }

    pub fn has<Q>(&self, value: &Q) -> bool
    where
        T: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.contains_key(value)
    }

    /// The stored member equivalent to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.find(value).and_then(|h| self.table.key(h))
    }

    /// Removes the member equivalent to `value`. Returns whether one existed.
    pub fn delete<Q>(&mut self, value: &Q) -> bool
    where
        T: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.remove(value).is_some()
    }

    /// Removes and returns the member equivalent to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: DeepEq<Q>,
        Q: ?Sized,
    {
        self.table.remove(value).map(|(member, ())| member)
    }

    /// Adds every member of `other`, in `other`'s order. Sets never
    /// conflict.
    pub fn merge(&mut self, other: &Self) -> &mut Self
    where
        T: Clone,
    {
        trace!("merging {} members into a set of {}", other.len(), self.len());
        for (_, member, ()) in other.table.iter() {
            self.table.insert_new(member.clone(), ());
        }
        self
    }
}

impl<T: DeepEq + Clone> MergeValue for DeepEqualSet<T> {
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
        let mut copy = self.clone();
        copy.merge(other);
        Some(Ok(copy))
    }
}

impl<T: DeepEq> DeepEq for DeepEqualSet<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
            || (self.len() == other.len() && self.iter().all(|m| other.has(m)))
    }
}

/// Order-insensitive deep equality of the members.
impl<T: DeepEq> PartialEq for DeepEqualSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl<T> Default for DeepEqualSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeepEq + Clone> Clone for DeepEqualSet<T> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for DeepEqualSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: DeepEq> FromIterator<T> for DeepEqualSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut set = Self::with_capacity(iter.size_hint().0);
        set.extend(iter);
        set
    }
}

impl<T: DeepEq> Extend<T> for DeepEqualSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<T: DeepEq, const N: usize> From<[T; N]> for DeepEqualSet<T> {
    fn from(members: [T; N]) -> Self {
        members.into_iter().collect()
    }
}

/// Iterator over members in insertion order.
pub struct Iter<'a, T> {
    inner: entry_table::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, member, ())| member)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Owning iterator over members in insertion order.
pub struct IntoIter<T> {
    inner: entry_table::IntoIter<T, ()>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(member, ())| member)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> IntoIterator for DeepEqualSet<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T> IntoIterator for &'a DeepEqualSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
