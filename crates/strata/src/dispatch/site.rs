//! Call sites: the live dispatch targets tracked by the world registry.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    dispatch::{DispatchCache, Operation, Thunk},
    exception::RunResult,
    runtime::Runtime,
    types::TypeKey,
    value::Value,
};

#[derive(Debug, Default)]
struct SiteState {
    /// Last receiver type seen and the thunk resolved for it.
    entry: Option<(TypeKey, Arc<Thunk>)>,
    stale: bool,
    recomputes: u64,
}

/// A monomorphic inline cache for one operation at one place in the program.
///
/// Sites are created through [`DispatchCache::call_site`], which registers a
/// weak handle so invalidation can reach them. A stale site recomputes its
/// thunk on its next call.
#[derive(Debug)]
pub struct CallSite {
    op: Operation,
    state: Mutex<SiteState>,
}

impl CallSite {
    pub(crate) fn new(op: Operation) -> Self {
        Self {
            op,
            state: Mutex::new(SiteState::default()),
        }
    }

    #[must_use]
    pub fn op(&self) -> &Operation {
        &self.op
    }

    /// True when an invalidation has passed since the last resolution.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.state.lock().stale
    }

    /// Number of times a cached thunk was replaced.
    #[must_use]
    pub fn recomputes(&self) -> u64 {
        self.state.lock().recomputes
    }

    pub(crate) fn mark_stale(&self) {
        self.state.lock().stale = true;
    }

    /// The thunk for a receiver of type `key`, re-resolving when stale or polymorphic.
    pub fn resolve(&self, cache: &DispatchCache, key: TypeKey) -> Arc<Thunk> {
        {
            let state = self.state.lock();
            if let Some((cached_key, thunk)) = &state.entry
                && !state.stale
                && *cached_key == key
                && thunk.version() == cache.version()
            {
                return Arc::clone(thunk);
            }
        }
        let thunk = cache.resolve(&self.op, key);
        let mut state = self.state.lock();
        if state.entry.is_some() {
            state.recomputes += 1;
        }
        state.entry = Some((key, Arc::clone(&thunk)));
        state.stale = false;
        thunk
    }

    /// Resolves for `args[0]` and runs the thunk.
    pub fn call(&self, rt: &Runtime, args: &[Value]) -> RunResult<Value> {
        let key = args.first().unwrap_or(&Value::None).type_key();
        self.resolve(rt.dispatch(), key).call(rt, args)
    }
}
