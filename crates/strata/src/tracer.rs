//! Dispatch tracing infrastructure.
//!
//! The dispatch cache reports resolution, thunk calls and world invalidations
//! through the [`DispatchTracer`] trait. Tracing is a policy switch: turning it
//! on or off bumps the world version, so every thunk is rebuilt with (or
//! without) the tracer hooks baked in and the untraced hot path pays nothing.
//!
//! # Tracers
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (default when tracing is enabled without a tracer) |
//! | [`LogTracer`] | Forwards events to `log::trace!` |
//! | [`RecordingTracer`] | Full event recording for assertions in tests |
//!
//! Dispatch runs on many threads at once, so tracers are `Send + Sync` and take
//! `&self`; implementations that collect data use interior mutability.

use std::fmt;

use parking_lot::Mutex;

use crate::dispatch::Operation;

/// Trace event emitted by the dispatch cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A cache lookup finished.
    Resolve {
        /// Display form of the operation, e.g. `__add__`.
        op: String,
        type_name: String,
        /// True when a current thunk was already cached.
        hit: bool,
    },
    /// A thunk started executing.
    Call {
        op: String,
        type_name: String,
        /// Dispatch depth on this thread after entering.
        depth: usize,
    },
    /// A thunk finished executing, successfully or not.
    Return { op: String, depth: usize },
    /// The world version was bumped and the registry walked.
    Invalidate {
        /// World version after the bump.
        version: u64,
        /// Number of live call sites marked stale.
        walked: usize,
    },
}

/// Hooks called by the dispatch cache.
///
/// All methods have default no-op implementations, so implementations only
/// override the hooks they care about.
pub trait DispatchTracer: Send + Sync + fmt::Debug {
    /// Called after every cache lookup.
    #[inline(always)]
    fn on_resolve(&self, _op: &Operation, _type_name: &str, _hit: bool) {}

    /// Called before a traced thunk runs its target.
    #[inline(always)]
    fn on_call(&self, _op: &Operation, _type_name: &str, _depth: usize) {}

    /// Called after a traced thunk returns.
    #[inline(always)]
    fn on_return(&self, _op: &Operation, _depth: usize) {}

    /// Called after an invalidation walk completes.
    #[inline(always)]
    fn on_invalidate(&self, _version: u64, _walked: usize) {}
}

// ============================================================================
// NoopTracer
// ============================================================================

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl DispatchTracer for NoopTracer {}

// ============================================================================
// LogTracer
// ============================================================================

/// Tracer that forwards every event to the `log` facade at trace level.
///
/// Run with `RUST_LOG=strata=trace` and any `log` backend to see the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl DispatchTracer for LogTracer {
    fn on_resolve(&self, op: &Operation, type_name: &str, hit: bool) {
        log::trace!("resolve {op} on '{type_name}' hit={hit}");
    }

    fn on_call(&self, op: &Operation, type_name: &str, depth: usize) {
        log::trace!(">>> {op} on '{type_name}' depth={depth}");
    }

    fn on_return(&self, op: &Operation, depth: usize) {
        log::trace!("<<< {op} depth={depth}");
    }

    fn on_invalidate(&self, version: u64, walked: usize) {
        log::trace!("invalidate version={version} walked={walked}");
    }
}

// ============================================================================
// RecordingTracer
// ============================================================================

/// Tracer that records every event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Removes and returns the recorded events.
    pub fn take(&self) -> Vec<TraceEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}

impl DispatchTracer for RecordingTracer {
    fn on_resolve(&self, op: &Operation, type_name: &str, hit: bool) {
        self.push(TraceEvent::Resolve {
            op: op.to_string(),
            type_name: type_name.to_owned(),
            hit,
        });
    }

    fn on_call(&self, op: &Operation, type_name: &str, depth: usize) {
        self.push(TraceEvent::Call {
            op: op.to_string(),
            type_name: type_name.to_owned(),
            depth,
        });
    }

    fn on_return(&self, op: &Operation, depth: usize) {
        self.push(TraceEvent::Return {
            op: op.to_string(),
            depth,
        });
    }

    fn on_invalidate(&self, version: u64, walked: usize) {
        self.push(TraceEvent::Invalidate { version, walked });
    }
}
