//! Merge capability for stored values and the conflict error.
//!
//! A map merge reconciles two values stored under equivalent keys. Values
//! that can absorb another value of their own type (the two containers,
//! plus wrappers around them) are *mergeable*; everything else is *plain*,
//! and two plain values under one key are a [`MergeConflict`].

use core::fmt;
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;

/// Two non-mergeable values collided under equivalent keys.
///
/// The key and both values are captured as JSON snapshots taken when the
/// conflict was detected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Merge conflict: Key: {key} This Value: {this_value} Other Value: {other_value}")]
pub struct MergeConflict {
    /// Key of the incoming entry that could not be merged.
    pub key: Value,
    /// Value already stored in the receiving map.
    pub this_value: Value,
    /// Value carried by the incoming entry.
    pub other_value: Value,
}

impl MergeConflict {
    pub fn new<K, V>(key: &K, this_value: &V, other_value: &V) -> Self
    where
        K: ?Sized + Serialize,
        V: ?Sized + Serialize,
    {
        Self {
            key: snapshot(key),
            this_value: snapshot(this_value),
            other_value: snapshot(other_value),
        }
    }

    /// Builds a conflict from `Debug` renderings, each captured as a JSON
    /// string. For keys or values that are not serializable; pass it to
    /// [`DeepEqualMap::merge_with`](crate::DeepEqualMap::merge_with).
    pub fn from_debug<K, V>(key: &K, this_value: &V, other_value: &V) -> Self
    where
        K: ?Sized + fmt::Debug,
        V: ?Sized + fmt::Debug,
    {
        Self {
            key: Value::String(format!("{key:?}")),
            this_value: Value::String(format!("{this_value:?}")),
            other_value: Value::String(format!("{other_value:?}")),
        }
    }
}

// A failed snapshot must not hide the conflict itself.
fn snapshot<T: ?Sized + Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")))
}

/// Values that a map merge may reconcile instead of reporting a conflict.
///
/// `merge_copy` returns `None` for plain values. Mergeable values return
/// `Some` with a fresh value built from a copy of `self` with `other` merged
/// into it; `self` is left untouched.
///
/// Host types that carry mergeable and plain variants implement this by
/// matching on the variant pair:
///
/// ```
/// use deep_equal_collections::{DeepEqualSet, MergeConflict, MergeValue};
///
/// #[derive(Clone)]
/// enum Field {
///     Count(u32),
///     Tags(DeepEqualSet<String>),
/// }
///
/// impl MergeValue for Field {
///     fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
///         match (self, other) {
///             (Field::Tags(a), Field::Tags(b)) => {
///                 let mut merged = a.clone();
///                 merged.merge(b);
///                 Some(Ok(Field::Tags(merged)))
///             }
///             _ => None,
///         }
///     }
/// }
///
/// let a = Field::Tags(["x".to_string()].into());
/// let b = Field::Tags(["y".to_string()].into());
/// assert!(matches!(a.merge_copy(&b), Some(Ok(Field::Tags(t))) if t.len() == 2));
/// assert!(Field::Count(1).merge_copy(&Field::Count(2)).is_none());
/// ```
pub trait MergeValue: Sized {
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>>;
}

/// Implements [`MergeValue`] as plain (never mergeable) for the listed types.
#[macro_export]
macro_rules! plain_merge_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::MergeValue for $t {
                #[inline]
                fn merge_copy(
                    &self,
                    _other: &Self,
                ) -> Option<Result<Self, $crate::MergeConflict>> {
                    None
                }
            }
        )*
    };
}

plain_merge_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
    Value,
);

// Sequences are plain: there is no rule for combining two of them.
impl<T> MergeValue for Vec<T> {
    fn merge_copy(&self, _other: &Self) -> Option<Result<Self, MergeConflict>> {
        None
    }
}

// An empty slot takes the incoming value; an incoming `None` adds nothing.
impl<T: MergeValue + Clone> MergeValue for Option<T> {
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
        match (self, other) {
            (None, _) => Some(Ok(other.clone())),
            (Some(_), None) => Some(Ok(self.clone())),
            (Some(a), Some(b)) => a.merge_copy(b).map(|r| r.map(Some)),
        }
    }
}

impl<T: MergeValue> MergeValue for Box<T> {
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
        (**self).merge_copy(&**other).map(|r| r.map(Box::new))
    }
}

impl<T: MergeValue> MergeValue for Rc<T> {
    fn merge_copy(&self, other: &Self) -> Option<Result<Self, MergeConflict>> {
        (**self).merge_copy(&**other).map(|r| r.map(Rc::new))
    }
}
