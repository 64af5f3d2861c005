//! Per-thread depth accounting for dispatch and recursive container traversal.
//!
//! Dispatch thunks built under a recursion limit enter a [`DepthGuard`] for
//! the duration of the call. Container `repr`, equality and hashing walk
//! nested structures through [`ReprGuard`]/[`DataDepthGuard`] so that
//! self-referencing containers print as `[...]` and deeply nested ones raise
//! instead of overflowing the native stack.

use std::cell::{Cell, RefCell};

use smallvec::SmallVec;

use crate::exception::{ExcType, RunResult};

/// Recommended maximum dispatch depth if not otherwise specified.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Maximum recursion depth for data structure operations (repr, eq, hash).
///
/// Separate from the dispatch limit. Lower in debug mode, where frames are larger.
#[cfg(debug_assertions)]
pub const MAX_DATA_RECURSION_DEPTH: usize = 100;

/// Maximum recursion depth for data structure operations (repr, eq, hash).
#[cfg(not(debug_assertions))]
pub const MAX_DATA_RECURSION_DEPTH: usize = 500;

thread_local! {
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static DATA_DEPTH: Cell<usize> = const { Cell::new(0) };
    static REPR_ACTIVE: RefCell<SmallVec<[usize; 8]>> = RefCell::new(SmallVec::new());
}

/// Current dispatch depth on this thread.
#[must_use]
pub fn dispatch_depth() -> usize {
    DISPATCH_DEPTH.with(Cell::get)
}

/// Increments the dispatch depth for as long as it is alive.
#[derive(Debug)]
pub(crate) struct DepthGuard {
    depth: usize,
}

impl DepthGuard {
    /// Enters one dispatch level, failing with `RecursionError` once `limit` is reached.
    ///
    /// `None` means unlimited.
    pub(crate) fn enter(limit: Option<usize>) -> RunResult<Self> {
        let current = dispatch_depth();
        if let Some(max) = limit
            && current >= max
        {
            return Err(ExcType::recursion_error());
        }
        let depth = current + 1;
        DISPATCH_DEPTH.with(|d| d.set(depth));
        Ok(Self { depth })
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|d| d.set(self.depth - 1));
    }
}

/// Guards one level of nested container traversal.
#[derive(Debug)]
pub(crate) struct DataDepthGuard(());

impl DataDepthGuard {
    pub(crate) fn enter() -> RunResult<Self> {
        let current = DATA_DEPTH.with(Cell::get);
        if current >= MAX_DATA_RECURSION_DEPTH {
            return Err(ExcType::recursion_error());
        }
        DATA_DEPTH.with(|d| d.set(current + 1));
        Ok(Self(()))
    }
}

impl Drop for DataDepthGuard {
    fn drop(&mut self) {
        DATA_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Marks a container as being printed on this thread.
///
/// [`ReprGuard::enter`] returns `None` when the container is already being
/// printed further up the stack; the caller then emits its `...` placeholder.
#[derive(Debug)]
pub(crate) struct ReprGuard {
    key: usize,
    _depth: DataDepthGuard,
}

impl ReprGuard {
    pub(crate) fn enter(key: usize) -> RunResult<Option<Self>> {
        let active = REPR_ACTIVE.with(|stack| stack.borrow().contains(&key));
        if active {
            return Ok(None);
        }
        let depth = DataDepthGuard::enter()?;
        REPR_ACTIVE.with(|stack| stack.borrow_mut().push(key));
        Ok(Some(Self { key, _depth: depth }))
    }
}

impl Drop for ReprGuard {
    fn drop(&mut self) {
        REPR_ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|k| *k == self.key) {
                stack.remove(pos);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn depth_guard_limits_and_unwinds() {
        let outer = DepthGuard::enter(Some(2)).unwrap();
        let inner = DepthGuard::enter(Some(2)).unwrap();
        assert_eq!(inner.depth(), 2);
        let err = DepthGuard::enter(Some(2)).unwrap_err();
        assert!(err.is_exception_type(ExcType::RecursionError));
        drop(inner);
        drop(outer);
        assert_eq!(dispatch_depth(), 0);
        assert!(DepthGuard::enter(None).is_ok());
    }

    #[test]
    fn repr_guard_detects_reentry() {
        let guard = ReprGuard::enter(42).unwrap();
        assert!(guard.is_some());
        assert!(ReprGuard::enter(42).unwrap().is_none());
        drop(guard);
        assert!(ReprGuard::enter(42).unwrap().is_some());
    }
}
