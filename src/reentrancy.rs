//! Debug-only guard against re-entering an entry table from user code.
//!
//! Every table operation runs `DeepEq::deep_eq` on stored keys, which is
//! user code. Lookups only read, so a `deep_eq` that performs another
//! lookup on the same table is harmless and allowed. Scans that precede a
//! mutation (`insert`, `insert_new`, `remove`) are exclusive: any access to
//! the table from inside them, and any mutation started from inside a
//! lookup, panics in debug builds. Release builds compile the check away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-table scan tracker. Lookups take `let _g = self.scan.read();`,
/// mutating operations `let _g = self.scan.write();`, before calling into
/// `DeepEq`.
#[derive(Debug)]
pub(crate) struct ScanGuard {
    #[cfg(debug_assertions)]
    readers: Cell<u32>,
    #[cfg(debug_assertions)]
    writing: Cell<bool>,
    // Single-threaded: keeps the owning table !Sync.
    _single_thread: PhantomData<Cell<()>>,
}

impl ScanGuard {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            readers: Cell::new(0),
            #[cfg(debug_assertions)]
            writing: Cell::new(false),
            _single_thread: PhantomData,
        }
    }

    /// Marks a read-only scan until the token is dropped. Nests with other
    /// reads; panics in debug builds inside a write scan.
    #[inline]
    pub(crate) fn read(&self) -> ScanToken<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.writing.get(),
                "reentrant access to a deep-equal collection from DeepEq during a mutation"
            );
            self.readers.set(self.readers.get() + 1);
            ScanToken {
                owner: self,
                write: false,
            }
        }

        #[cfg(not(debug_assertions))]
        {
            ScanToken { _owner: PhantomData }
        }
    }

    /// Marks a scan that precedes a mutation. Panics in debug builds if any
    /// scan is already running.
    #[inline]
    pub(crate) fn write(&self) -> ScanToken<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.writing.get() && self.readers.get() == 0,
                "mutation of a deep-equal collection from DeepEq during a scan"
            );
            self.writing.set(true);
            ScanToken {
                owner: self,
                write: true,
            }
        }

        #[cfg(not(debug_assertions))]
        {
            ScanToken { _owner: PhantomData }
        }
    }
}

/// RAII token returned by [`ScanGuard::read`] and [`ScanGuard::write`].
pub(crate) struct ScanToken<'a> {
    #[cfg(debug_assertions)]
    owner: &'a ScanGuard,
    #[cfg(debug_assertions)]
    write: bool,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ScanGuard>,
}

impl Drop for ScanToken<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            if self.write {
                self.owner.writing.set(false);
            } else {
                let n = self.owner.readers.get();
                debug_assert!(n > 0);
                self.owner.readers.set(n - 1);
            }
        }
    }
}
