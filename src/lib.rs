//! deep-equal-collections: Map and Set containers whose keys are compared
//! by deep structural equality instead of identity or `Hash`.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a key that is structurally equal to a stored key *is* that key,
//!   whatever object it lives in, and a whole map can be merged into another
//!   with recursive reconciliation of container values.
//! - Layers:
//!   - `DeepEq`: the structural equality predicate. Implemented for std
//!     scalars, strings, sequences, tuples, std maps/sets, pointers, cells,
//!     `serde_json::Value`, and the two containers.
//!   - `canonicalize`: maps a candidate to the first stored key it equals.
//!   - `EntryTable<K, V>`: insertion-ordered storage with stable handles;
//!     every lookup and insert goes through canonicalization.
//!   - `DeepEqualMap<K, V>` / `DeepEqualSet<T>`: public API over the table.
//!   - `MergeValue` / `MergeConflict`: the merge capability and its error.
//!
//! Constraints
//! - Single-threaded, synchronous. No internal locking.
//! - Linear scan per operation; keys are never hashed.
//! - At most one stored key per equivalence class; the first one inserted
//!   stays the representative along with its `Handle`.
//! - Lookups compare current contents. Keys with shared interior
//!   mutability are not reindexed when they change.
//! - Cyclic keys are unsupported; comparing them may not terminate.
//!
//! Reentrancy policy
//! - Table operations call user `DeepEq` code while scanning. Lookups only
//!   read and may nest. A debug-only guard panics if `DeepEq` code touches a
//!   table while that table scans ahead of a mutation, or mutates it during
//!   a lookup. Removed keys and values are dropped only after the table is
//!   consistent again.
//! - A `Handle` resolves only in the collection that issued it.
//!
//! Merge semantics
//! - `DeepEqualMap::merge` walks the other map in order. Missing keys are
//!   added; mergeable values are replaced by a merged copy; anything else
//!   stops the merge with `MergeConflict`, keeping what was already merged.
//!   `merge_with` takes the conflict constructor for non-serde types.
//! - `DeepEqualSet::merge` adds every member and never fails.
//!
//! Serialization
//! - `Serialize` is the JSON projection: `[[key, value], ...]` for maps and
//!   `[member, ...]` for sets. `Deserialize` rebuilds through `set`/`add`.

mod canonical;
mod deep_eq;
mod entry_table;
mod entry_table_proptest;
mod map;
mod merge;
mod reentrancy;
mod serde_impls;
mod set;

// Public surface
pub use canonical::canonicalize;
pub use deep_eq::DeepEq;
pub use entry_table::{Handle, HandleError};
pub use map::DeepEqualMap;
pub use merge::{MergeConflict, MergeValue};
pub use set::DeepEqualSet;

pub mod map_iter {
    //! Iterator types returned by [`DeepEqualMap`](crate::DeepEqualMap).
    pub use crate::map::{IntoIter, Iter, IterMut};
}

pub mod set_iter {
    //! Iterator types returned by [`DeepEqualSet`](crate::DeepEqualSet).
    pub use crate::set::{IntoIter, Iter};
}
