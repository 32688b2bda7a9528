//! Structural equality used to decide whether two keys are "the same key".
//!
//! `DeepEq` looks through shared pointers and cells and compares what they
//! currently hold. Floats treat `NaN` as equal to itself, and JSON numbers
//! compare by exact numeric value. Pointer identity is only a shortcut: it
//! never changes the answer a full comparison would give.

use core::cell::{Cell, RefCell};
use core::hash::{BuildHasher, Hash};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// Deep structural equality between `Self` and `Rhs`.
///
/// Implementations must be pure, symmetric where both directions exist, and
/// reflexive. Comparing cyclic structures is not supported and may not
/// terminate.
pub trait DeepEq<Rhs: ?Sized = Self> {
    fn deep_eq(&self, other: &Rhs) -> bool;
}

/// Implements [`DeepEq`] for types whose `PartialEq` already compares
/// contents structurally.
///
/// ```
/// use deep_equal_collections::{deep_eq_via_partial_eq, DeepEq};
///
/// #[derive(PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
/// deep_eq_via_partial_eq!(Point);
///
/// assert!(Point { x: 1, y: 2 }.deep_eq(&Point { x: 1, y: 2 }));
/// ```
#[macro_export]
macro_rules! deep_eq_via_partial_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::DeepEq for $t {
                #[inline]
                fn deep_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

deep_eq_via_partial_eq!(
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
    str,
    String,
);

impl DeepEq<str> for String {
    fn deep_eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl DeepEq<String> for str {
    fn deep_eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

impl<'a> DeepEq<&'a str> for String {
    fn deep_eq(&self, other: &&'a str) -> bool {
        self.as_str() == *other
    }
}

macro_rules! deep_eq_float {
    ($($t:ty),*) => {
        $(
            impl DeepEq for $t {
                // NaN equals NaN so that insertion stays idempotent.
                #[inline]
                fn deep_eq(&self, other: &Self) -> bool {
                    self == other || (self.is_nan() && other.is_nan())
                }
            }
        )*
    };
}

deep_eq_float!(f32, f64);

impl<'a, 'b, A, B> DeepEq<&'b B> for &'a A
where
    A: ?Sized + DeepEq<B>,
    B: ?Sized,
{
    #[inline]
    fn deep_eq(&self, other: &&'b B) -> bool {
        (**self).deep_eq(*other)
    }
}

impl<A, B> DeepEq<Box<B>> for Box<A>
where
    A: ?Sized + DeepEq<B>,
    B: ?Sized,
{
    fn deep_eq(&self, other: &Box<B>) -> bool {
        (**self).deep_eq(&**other)
    }
}

impl<T: ?Sized + DeepEq> DeepEq for Rc<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).deep_eq(&**other)
    }
}

impl<T: ?Sized + DeepEq> DeepEq for Arc<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).deep_eq(&**other)
    }
}

// Cells are compared by what they hold right now.
impl<T: ?Sized + DeepEq> DeepEq for RefCell<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other) || self.borrow().deep_eq(&*other.borrow())
    }
}

impl<T: Copy + DeepEq> DeepEq for Cell<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.get().deep_eq(&other.get())
    }
}

impl<A: DeepEq<B>, B> DeepEq<Option<B>> for Option<A> {
    fn deep_eq(&self, other: &Option<B>) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.deep_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

fn seq_deep_eq<'a, 'b, A, B>(
    a: impl ExactSizeIterator<Item = &'a A>,
    b: impl ExactSizeIterator<Item = &'b B>,
) -> bool
where
    A: DeepEq<B> + 'a,
    B: 'b,
{
    a.len() == b.len() && a.zip(b).all(|(x, y)| x.deep_eq(y))
}

impl<A: DeepEq<B>, B> DeepEq<[B]> for [A] {
    fn deep_eq(&self, other: &[B]) -> bool {
        seq_deep_eq(self.iter(), other.iter())
    }
}

impl<A: DeepEq<B>, B, const N: usize> DeepEq<[B; N]> for [A; N] {
    fn deep_eq(&self, other: &[B; N]) -> bool {
        seq_deep_eq(self.iter(), other.iter())
    }
}

impl<A: DeepEq<B>, B> DeepEq<Vec<B>> for Vec<A> {
    fn deep_eq(&self, other: &Vec<B>) -> bool {
        seq_deep_eq(self.iter(), other.iter())
    }
}

impl<A: DeepEq<B>, B> DeepEq<[B]> for Vec<A> {
    fn deep_eq(&self, other: &[B]) -> bool {
        seq_deep_eq(self.iter(), other.iter())
    }
}

impl<A: DeepEq<B>, B> DeepEq<VecDeque<B>> for VecDeque<A> {
    fn deep_eq(&self, other: &VecDeque<B>) -> bool {
        seq_deep_eq(self.iter(), other.iter())
    }
}

macro_rules! deep_eq_tuple {
    ($(($($name:ident $idx:tt),+))+) => {
        $(
            impl<$($name: DeepEq),+> DeepEq for ($($name,)+) {
                fn deep_eq(&self, other: &Self) -> bool {
                    $(self.$idx.deep_eq(&other.$idx))&&+
                }
            }
        )+
    };
}

deep_eq_tuple! {
    (A 0)
    (A 0, B 1)
    (A 0, B 1, C 2)
    (A 0, B 1, C 2, D 3)
    (A 0, B 1, C 2, D 3, E 4)
    (A 0, B 1, C 2, D 3, E 4, F 5)
}

// Field mappings: member names are matched by their own `Ord`/`Eq`, values
// recursively. Member order never matters.
impl<K: Ord, V: DeepEq> DeepEq for BTreeMap<K, V> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v.deep_eq(w)))
    }
}

impl<K, V, S> DeepEq for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: DeepEq,
    S: BuildHasher,
{
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v.deep_eq(w)))
    }
}

impl<T: Ord> DeepEq for BTreeSet<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T, S> DeepEq for HashSet<T, S>
where
    T: Eq + Hash,
    S: BuildHasher,
{
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }
}

// Numbers compare by exact mathematical value, so the relation stays
// transitive across integer and float representations.
fn number_deep_eq(a: &Number, b: &Number) -> bool {
    match (exact_int(a), exact_int(b)) {
        (Some(x), Some(y)) => x == y,
        (Some(i), None) => b.as_f64().is_some_and(|f| int_eq_float(i, f)),
        (None, Some(i)) => a.as_f64().is_some_and(|f| int_eq_float(i, f)),
        (None, None) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.deep_eq(&y),
            _ => false,
        },
    }
}

fn exact_int(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// Every JSON integer lies in [-2^63, 2^64).
const INT_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const INT_END_F64: f64 = 18_446_744_073_709_551_616.0;

fn int_eq_float(i: i128, f: f64) -> bool {
    f.fract() == 0.0 && (INT_MIN_F64..INT_END_F64).contains(&f) && f as i128 == i
}

impl DeepEq for Value {
    fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_deep_eq(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.deep_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.deep_eq(w)))
            }
            // Different shapes are never equal.
            _ => false,
        }
    }
}
