//! Canonical-key resolution: map a candidate onto the stored representative
//! of its equivalence class.

use crate::deep_eq::DeepEq;

/// Returns the first key in `existing` that is deep-equal to `candidate`, or
/// `candidate` itself when none is.
///
/// `existing` is scanned in its own iteration order, so with an
/// insertion-ordered source the oldest representative wins.
///
/// ```
/// use deep_equal_collections::canonicalize;
///
/// let stored = vec![vec![1i32, 2], vec![3]];
/// let query = vec![3i32];
/// let canonical = canonicalize(&stored, &query);
/// assert!(std::ptr::eq(canonical, &stored[1]));
///
/// let fresh = vec![4i32];
/// assert!(std::ptr::eq(canonicalize(&stored, &fresh), &fresh));
/// ```
pub fn canonicalize<'a, K, I>(existing: I, candidate: &'a K) -> &'a K
where
    K: ?Sized + DeepEq + 'a,
    I: IntoIterator<Item = &'a K>,
{
    find_match(existing.into_iter().map(|k| (k, k)), candidate).unwrap_or(candidate)
}

/// Scans `(tag, key)` pairs in order and returns the tag of the first key
/// deep-equal to `candidate`.
pub(crate) fn find_match<'a, T, K, Q>(
    entries: impl IntoIterator<Item = (T, &'a K)>,
    candidate: &Q,
) -> Option<T>
where
    K: ?Sized + DeepEq<Q> + 'a,
    Q: ?Sized,
{
    entries
        .into_iter()
        .find(|&(_, k)| k.deep_eq(candidate))
        .map(|(tag, _)| tag)
}
