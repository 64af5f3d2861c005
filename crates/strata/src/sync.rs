//! Per-object monitor locks and deterministic two-object lock ordering.
//!
//! Every mutable container owns one [`Monitor`]: a re-entrant mutex around a
//! `RefCell`, giving monitor semantics (re-entrant on the owning thread,
//! blocking for others). Operations that must read two containers
//! consistently use [`OrderedLocker`], which always acquires the two monitors
//! in `(identity_hash, id)` order so that `f(A, B)` and `f(B, A)` running on
//! two threads cannot deadlock.
//!
//! Guards are never held across calls into user code. Code that needs to call
//! out takes a [`MonitorGuard`], reads what it needs, and calls
//! [`MonitorGuard::release`] before the callback.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Monotonic allocation-order identifier for shared objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocates the next id. Ids are unique for the life of the process.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A re-entrant, per-instance lock around container state.
pub struct Monitor<T> {
    id: ObjectId,
    lock: ReentrantMutex<RefCell<T>>,
}

impl<T> Monitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: ObjectId::next(),
            lock: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Address-derived hash, stable while the monitor does not move.
    ///
    /// Monitors live behind `Arc`, so the address is fixed for the object's life.
    #[must_use]
    pub fn identity_hash(&self) -> u32 {
        let addr = std::ptr::from_ref(self) as usize;
        #[expect(clippy::cast_possible_truncation, reason = "hash only needs the low bits")]
        let hash = (addr >> 4) as u32;
        hash
    }

    /// Sort key used for deterministic lock acquisition.
    fn order_key(&self) -> (u32, ObjectId) {
        (self.identity_hash(), self.id)
    }

    /// Acquires the lock, blocking if another thread holds it.
    pub fn enter(&self) -> MonitorGuard<'_, T> {
        MonitorGuard {
            guard: self.lock.lock(),
        }
    }

    /// Runs `f` with shared access under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock.lock();
        let value = guard.borrow();
        f(&value)
    }

    /// Runs `f` with exclusive access under the lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let guard = self.lock.lock();
        let mut value = guard.borrow_mut();
        f(&mut value)
    }
}

impl<T: Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Holds a monitor's lock until dropped or explicitly released.
pub struct MonitorGuard<'a, T> {
    guard: ReentrantMutexGuard<'a, RefCell<T>>,
}

impl<T> MonitorGuard<'_, T> {
    pub fn get(&self) -> Ref<'_, T> {
        self.guard.borrow()
    }

    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.guard.borrow_mut()
    }

    /// Releases the lock before the end of scope, typically right before a callback.
    pub fn release(self) {
        drop(self);
    }
}

/// Two monitors locked in deterministic global order.
///
/// The same monitor may be passed twice; the second acquisition re-enters.
pub struct OrderedLocker<'a, A, B> {
    left: ReentrantMutexGuard<'a, RefCell<A>>,
    right: ReentrantMutexGuard<'a, RefCell<B>>,
}

impl<'a, A, B> OrderedLocker<'a, A, B> {
    /// Locks `left` and `right`, lower `(identity_hash, id)` first.
    pub fn new(left: &'a Monitor<A>, right: &'a Monitor<B>) -> Self {
        if left.order_key() <= right.order_key() {
            let left_guard = left.lock.lock();
            let right_guard = right.lock.lock();
            Self {
                left: left_guard,
                right: right_guard,
            }
        } else {
            let right_guard = right.lock.lock();
            let left_guard = left.lock.lock();
            Self {
                left: left_guard,
                right: right_guard,
            }
        }
    }

    pub fn left(&self) -> Ref<'_, A> {
        self.left.borrow()
    }

    pub fn right(&self) -> Ref<'_, B> {
        self.right.borrow()
    }

    pub fn left_mut(&self) -> RefMut<'_, A> {
        self.left.borrow_mut()
    }

    /// Releases both locks.
    pub fn release(self) {
        drop(self);
    }
}
