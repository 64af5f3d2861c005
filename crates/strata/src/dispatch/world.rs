//! The world version and the weak registry of live call sites.
//!
//! Call sites register a `Weak` handle on a singly-linked list whose head is
//! pushed with compare-and-swap. Two walkers exist:
//!
//! * invalidation, which bumps the version while holding the world lock
//!   (blocking new registrations), detaches the list, marks every live site
//!   stale, and splices the list back;
//! * the sweep, which unlinks dead handles and retunes its own trigger. It
//!   takes the world lock only to update the bookkeeping counters.
//!
//! Registrations never wait for a sweep. Walkers exclude each other through
//! a separate walk lock, so a node is only ever freed by the walker that
//! unlinked it.

use std::{
    ptr,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering},
    },
    thread,
};

use parking_lot::Mutex;

use crate::dispatch::{CacheConfig, CallSite};

struct Node {
    site: Weak<CallSite>,
    next: AtomicPtr<Node>,
}

/// Counters guarded by the world lock.
#[derive(Debug)]
struct Bookkeeping {
    /// Registered nodes not yet reclaimed, live or dead.
    count: usize,
    /// Registration count that triggers the next sweep.
    next_cleanup: i64,
}

pub(crate) struct World {
    version: AtomicU64,
    head: AtomicPtr<Node>,
    bookkeeping: Mutex<Bookkeeping>,
    walk: Mutex<()>,
    sweeping: AtomicBool,
    sweeps: AtomicU64,
    reclaimed: AtomicU64,
    config: CacheConfig,
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepOutcome {
    pub removed: usize,
    pub kept: usize,
    pub next_cleanup: i64,
}

impl World {
    pub fn new(config: CacheConfig) -> Arc<Self> {
        Arc::new(Self {
            version: AtomicU64::new(0),
            head: AtomicPtr::new(ptr::null_mut()),
            bookkeeping: Mutex::new(Bookkeeping {
                count: 0,
                next_cleanup: threshold(config.initial_cleanup_threshold),
            }),
            walk: Mutex::new(()),
            sweeping: AtomicBool::new(false),
            sweeps: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
            config,
        })
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn reclaimed(&self) -> u64 {
        self.reclaimed.load(Ordering::Relaxed)
    }

    /// Adds a call site to the registry, scheduling a sweep every so many registrations.
    pub fn register(self: &Arc<Self>, site: &Arc<CallSite>) {
        let node = Box::into_raw(Box::new(Node {
            site: Arc::downgrade(site),
            next: AtomicPtr::new(ptr::null_mut()),
        }));
        let due = {
            let mut books = self.bookkeeping.lock();
            self.push_chain(node, node);
            let due = i64::try_from(books.count).unwrap_or(i64::MAX) >= books.next_cleanup;
            books.count += 1;
            due
        };
        if due {
            self.schedule_sweep();
        }
    }

    /// Pushes the chain `first..=last` onto the head.
    ///
    /// The caller owns every node of the chain.
    fn push_chain(&self, first: *mut Node, last: *mut Node) {
        let mut current = self.head.load(Ordering::Acquire);
        loop {
            // SAFETY: `last` belongs to a chain the caller owns and has not yet published.
            unsafe { (*last).next.store(current, Ordering::Relaxed) };
            match self
                .head
                .compare_exchange_weak(current, first, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Bumps the version and marks every live site stale.
    ///
    /// Returns the new version and the number of live sites walked.
    pub fn invalidate(&self) -> (u64, usize) {
        let _books = self.bookkeeping.lock();
        let _walk = self.walk.lock();
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;

        let first = self.head.swap(ptr::null_mut(), Ordering::AcqRel);
        let mut walked = 0;
        let mut last = ptr::null_mut();
        let mut cursor = first;
        while !cursor.is_null() {
            // SAFETY: the detached chain is reachable only from this walker, and
            // nodes are freed only by a walker holding the walk lock.
            let node = unsafe { &*cursor };
            if let Some(site) = node.site.upgrade() {
                site.mark_stale();
                walked += 1;
            }
            last = cursor;
            cursor = node.next.load(Ordering::Acquire);
        }
        if !first.is_null() {
            self.push_chain(first, last);
        }
        (version, walked)
    }

    /// Number of registered sites still alive.
    pub fn live_sites(&self) -> usize {
        let _walk = self.walk.lock();
        let mut live = 0;
        let mut cursor = self.head.load(Ordering::Acquire);
        while !cursor.is_null() {
            // SAFETY: nodes reachable from the head stay allocated while the walk lock is held.
            let node = unsafe { &*cursor };
            if node.site.strong_count() > 0 {
                live += 1;
            }
            cursor = node.next.load(Ordering::Acquire);
        }
        live
    }

    /// Starts a sweep on the helper thread, or inline when that is disabled or fails.
    fn schedule_sweep(self: &Arc<Self>) {
        if self.sweeping.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.config.background_sweep {
            self.finish_sweep();
            return;
        }
        let world = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("strata-sweep".to_owned())
            .spawn(move || world.finish_sweep());
        if let Err(err) = spawned {
            log::warn!("could not spawn registry sweep thread ({err}); sweeping inline");
            self.finish_sweep();
        }
    }

    fn finish_sweep(&self) {
        self.sweep();
        self.sweeping.store(false, Ordering::Release);
    }

    /// Unlinks dead handles, then retunes the next trigger point.
    pub fn sweep(&self) -> SweepOutcome {
        let (removed, kept) = self.unlink_dead();

        let mut books = self.bookkeeping.lock();
        let count = books.count;
        if count == 0 {
            books.next_cleanup = threshold(self.config.initial_cleanup_threshold);
        } else {
            let removed_share = removed as f64 / count as f64;
            let target_ratio = removed_share / self.config.removal_goal;
            books.count = count.saturating_sub(removed);
            let next = if target_ratio == 0.0 {
                -1
            } else {
                #[expect(clippy::cast_possible_truncation, reason = "a threshold saturates at i64::MAX")]
                let stretch = (books.next_cleanup as f64 / target_ratio) as i64;
                threshold(books.count).saturating_add(stretch)
            };
            if next > 0 {
                books.next_cleanup = next;
            } else {
                books.next_cleanup = books.next_cleanup.saturating_add(threshold(self.config.cleanup_backoff));
            }
        }
        let outcome = SweepOutcome {
            removed,
            kept,
            next_cleanup: books.next_cleanup,
        };
        drop(books);

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.reclaimed.fetch_add(removed as u64, Ordering::Relaxed);
        log::debug!(
            "registry sweep removed {removed}, kept {kept}, next sweep at {}",
            outcome.next_cleanup
        );
        outcome
    }

    /// Removes nodes whose site is gone. Returns `(removed, kept)`.
    fn unlink_dead(&self) -> (usize, usize) {
        let _walk = self.walk.lock();
        let mut removed = 0;
        let mut kept = 0;
        let mut dead: Vec<*mut Node> = Vec::new();

        // Dead nodes at the head race with registrations, so they leave by CAS.
        let mut cursor = self.head.load(Ordering::Acquire);
        while !cursor.is_null() {
            // SAFETY: the walk lock is held, so no other walker frees nodes.
            let node = unsafe { &*cursor };
            if node.site.strong_count() > 0 {
                break;
            }
            let next = node.next.load(Ordering::Acquire);
            match self
                .head
                .compare_exchange(cursor, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    dead.push(cursor);
                    removed += 1;
                    cursor = next;
                }
                Err(actual) => cursor = actual,
            }
        }

        // Past the head only this walker writes `next` links.
        let mut prev = cursor;
        while !prev.is_null() {
            kept += 1;
            // SAFETY: as above; `prev` is a live node reachable from the head.
            let prev_node = unsafe { &*prev };
            let mut next = prev_node.next.load(Ordering::Acquire);
            while !next.is_null() {
                // SAFETY: as above.
                let node = unsafe { &*next };
                if node.site.strong_count() > 0 {
                    break;
                }
                dead.push(next);
                removed += 1;
                next = node.next.load(Ordering::Acquire);
            }
            prev_node.next.store(next, Ordering::Release);
            prev = next;
        }

        for node in dead {
            // SAFETY: each dead node was unlinked above and is unreachable from the head.
            drop(unsafe { Box::from_raw(node) });
        }
        (removed, kept)
    }
}

impl Drop for World {
    fn drop(&mut self) {
        let mut cursor = *self.head.get_mut();
        while !cursor.is_null() {
            // SAFETY: `&mut self` proves no other thread can reach the list.
            let node = unsafe { Box::from_raw(cursor) };
            cursor = node.next.load(Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("version", &self.version())
            .field("bookkeeping", &*self.bookkeeping.lock())
            .finish_non_exhaustive()
    }
}

fn threshold(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dispatch::Operation;

    fn inline_world(initial: usize) -> Arc<World> {
        World::new(CacheConfig {
            initial_cleanup_threshold: initial,
            background_sweep: false,
            ..CacheConfig::default()
        })
    }

    fn site() -> Arc<CallSite> {
        Arc::new(CallSite::new(Operation::Len))
    }

    #[test]
    fn invalidate_marks_live_sites_only() {
        let world = inline_world(1000);
        let keep = site();
        world.register(&keep);
        world.register(&site());
        let (version, walked) = world.invalidate();
        assert_eq!(version, 1);
        assert_eq!(walked, 1);
        assert!(keep.is_stale());
        assert_eq!(world.live_sites(), 1);
    }

    #[test]
    fn sweep_unlinks_head_and_interior_nodes() {
        let world = inline_world(1000);
        let a = site();
        world.register(&a);
        world.register(&site());
        let c = site();
        world.register(&c);
        world.register(&site());
        let outcome = world.sweep();
        assert_eq!((outcome.removed, outcome.kept), (2, 2));
        assert_eq!(world.live_sites(), 2);
        assert_eq!(world.invalidate().1, 2);
    }

    #[test]
    fn threshold_retunes_toward_removal_goal() {
        let world = inline_world(1000);
        let kept: Vec<_> = (0..10).map(|_| site()).collect();
        for s in &kept {
            world.register(s);
        }
        for _ in 0..10 {
            world.register(&site());
        }
        // half removed meets the goal exactly: next = remaining + previous threshold
        let outcome = world.sweep();
        assert_eq!(outcome.removed, 10);
        assert_eq!(outcome.next_cleanup, 10 + 1000);

        // nothing removed backs off
        let outcome = world.sweep();
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.next_cleanup, 1010 + 500);
    }

    #[test]
    fn registration_triggers_inline_sweep() {
        let world = inline_world(3);
        for _ in 0..4 {
            world.register(&site());
        }
        assert_eq!(world.sweeps(), 1);
        assert_eq!(world.reclaimed(), 3);
    }
}
