//! The process-wide dispatch cache.
//!
//! Lookups are keyed by `(Operation, TypeKey)`. A hit takes only a read lock
//! on the entry map; a miss builds the thunk with no lock held (slot lookup
//! may call into the object model) and installs it stamped with the version
//! read before the build. A thunk built across an invalidation is therefore
//! stale on arrival and rebuilt by the next lookup.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    dispatch::{
        CacheConfig, CallSite, DispatchPolicy, Operation, Thunk, builtins,
        thunk::Target,
        world::World,
    },
    object_model::ObjectModel,
    tracer::{DispatchTracer, NoopTracer},
    types::TypeKey,
    value::ClassId,
};

type CacheKey = (Operation, TypeKey);

#[derive(Debug, Clone)]
enum SlotEntry {
    /// A thread is building the thunk under this version.
    Resolving(u64),
    Cached(Arc<Thunk>),
}

/// Observable state of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    Empty,
    Resolving,
    Cached,
    /// Built under an older world version; the next lookup rebuilds it.
    Stale,
}

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Thunks built, including ones discarded because the world moved.
    pub resolutions: u64,
    pub invalidations: u64,
    pub world_version: u64,
    pub entries: usize,
    pub sweeps: u64,
    /// Dead call-site handles removed by sweeps.
    pub reclaimed: u64,
}

impl CacheStats {
    /// Hit rate as a percentage; 0.0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    resolutions: AtomicU64,
    invalidations: AtomicU64,
}

/// Maps `(operation, type)` to a [`Thunk`], rebuilding thunks after the world changes.
pub struct DispatchCache {
    model: Arc<dyn ObjectModel>,
    entries: RwLock<HashMap<CacheKey, SlotEntry, RandomState>>,
    policy: RwLock<DispatchPolicy>,
    tracer: RwLock<Option<Arc<dyn DispatchTracer>>>,
    world: Arc<World>,
    counters: Counters,
}

impl DispatchCache {
    #[must_use]
    pub fn new(model: Arc<dyn ObjectModel>, config: CacheConfig, policy: DispatchPolicy) -> Self {
        Self {
            model,
            entries: RwLock::new(HashMap::with_hasher(RandomState::new())),
            policy: RwLock::new(policy),
            tracer: RwLock::new(None),
            world: World::new(config),
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &dyn ObjectModel {
        &*self.model
    }

    /// Current world version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.world.version()
    }

    #[must_use]
    pub fn policy(&self) -> DispatchPolicy {
        *self.policy.read()
    }

    /// Current dispatch depth limit; `None` means unlimited.
    #[must_use]
    pub fn recursion_limit(&self) -> Option<usize> {
        self.policy.read().recursion_limit
    }

    /// Name used in thunks and error messages for a type key.
    fn type_name(&self, key: TypeKey) -> Arc<str> {
        match key {
            TypeKey::Builtin(ty) => Arc::from(<&'static str>::from(ty)),
            TypeKey::Class(class) => Arc::from(self.model.class_name(class)),
        }
    }

    /// Returns the thunk for `op` on `key`, building it on a miss or after an invalidation.
    pub fn resolve(&self, op: &Operation, key: TypeKey) -> Arc<Thunk> {
        let version = self.world.version();
        let cached = match self.entries.read().get(&(op.clone(), key)) {
            Some(SlotEntry::Cached(thunk)) if thunk.version() == version => Some(Arc::clone(thunk)),
            _ => None,
        };
        if let Some(thunk) = cached {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("dispatch hit {op} on {}", thunk.type_name());
            if let Some(tracer) = thunk.tracer() {
                tracer.on_resolve(op, thunk.type_name(), true);
            }
            return thunk;
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .insert((op.clone(), key), SlotEntry::Resolving(version));
        let thunk = Arc::new(self.build(op, key, version));
        self.counters.resolutions.fetch_add(1, Ordering::Relaxed);
        log::trace!("dispatch miss {op} on {}: resolved under version {version}", thunk.type_name());
        self.entries
            .write()
            .insert((op.clone(), key), SlotEntry::Cached(Arc::clone(&thunk)));
        if let Some(tracer) = thunk.tracer() {
            tracer.on_resolve(op, thunk.type_name(), false);
        }
        thunk
    }

    /// Looks up the slot and wraps it according to the current policy.
    fn build(&self, op: &Operation, key: TypeKey, version: u64) -> Thunk {
        let target = match key {
            TypeKey::Builtin(ty) => builtins::slot(ty, op).map_or(Target::Missing, Target::Builtin),
            TypeKey::Class(class) => match self.model.resolve_slot(class, &op.slot_name()) {
                Some(value) if matches!(op, Operation::GetMember(_)) => Target::Attribute(value),
                Some(value) => Target::Slot(value),
                None => Target::Missing,
            },
        };
        let policy = self.policy();
        let tracer = policy.tracing.then(|| {
            self.tracer
                .read()
                .clone()
                .unwrap_or_else(|| Arc::new(NoopTracer) as Arc<dyn DispatchTracer>)
        });
        Thunk::new(
            op.clone(),
            key,
            self.type_name(key),
            target,
            version,
            policy.recursion_limit.is_some(),
            tracer,
        )
    }

    /// State of the slot for `op` on `key`.
    #[must_use]
    pub fn slot_state(&self, op: &Operation, key: TypeKey) -> SlotState {
        let version = self.world.version();
        match self.entries.read().get(&(op.clone(), key)) {
            None => SlotState::Empty,
            Some(SlotEntry::Resolving(started)) if *started == version => SlotState::Resolving,
            Some(SlotEntry::Cached(thunk)) if thunk.version() == version => SlotState::Cached,
            Some(_) => SlotState::Stale,
        }
    }

    /// Bumps the world version and marks every live call site stale.
    pub fn invalidate_all(&self) {
        self.bump("explicit invalidation");
    }

    /// Reports that the slots of `class` changed.
    pub fn notify_type_changed(&self, class: ClassId) {
        log::debug!("slots of class {} changed", class.0);
        self.bump("type change");
    }

    /// Replaces the policy, invalidating when the thunk shape changes.
    pub fn set_policy(&self, policy: DispatchPolicy) {
        let reshaped = {
            let mut current = self.policy.write();
            let reshaped = current.reshapes(&policy);
            *current = policy;
            reshaped
        };
        if reshaped {
            self.bump("policy change");
        }
    }

    pub fn set_tracing(&self, tracing: bool) {
        self.set_policy(DispatchPolicy {
            tracing,
            ..self.policy()
        });
    }

    /// Sets the dispatch depth limit; only toggling to or from unlimited invalidates.
    pub fn set_recursion_limit(&self, recursion_limit: Option<usize>) {
        self.set_policy(DispatchPolicy {
            recursion_limit,
            ..self.policy()
        });
    }

    /// Installs the tracer used by thunks built while tracing is on.
    pub fn set_tracer(&self, tracer: Option<Arc<dyn DispatchTracer>>) {
        *self.tracer.write() = tracer;
        if self.policy().tracing {
            self.bump("tracer change");
        }
    }

    fn bump(&self, reason: &str) {
        let (version, walked) = self.world.invalidate();
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        log::debug!("world version {version} after {reason}; {walked} call sites marked stale");
        if self.policy().tracing
            && let Some(tracer) = self.tracer.read().clone()
        {
            tracer.on_invalidate(version, walked);
        }
    }

    /// Creates a call site for `op` and registers it for invalidation.
    #[must_use]
    pub fn call_site(&self, op: Operation) -> Arc<CallSite> {
        let site = Arc::new(CallSite::new(op));
        self.world.register(&site);
        site
    }

    /// Runs a registry sweep on the calling thread; returns the number of dead handles removed.
    pub fn sweep_now(&self) -> usize {
        self.world.sweep().removed
    }

    /// Registered call sites that are still alive.
    #[must_use]
    pub fn live_sites(&self) -> usize {
        self.world.live_sites()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            resolutions: self.counters.resolutions.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            world_version: self.world.version(),
            entries: self.entries.read().len(),
            sweeps: self.world.sweeps(),
            reclaimed: self.world.reclaimed(),
        }
    }
}

impl fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchCache")
            .field("model", &self.model)
            .field("policy", &self.policy())
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{dispatch::BinaryOp, object_model::NullModel, types::Type};

    fn cache() -> DispatchCache {
        DispatchCache::new(Arc::new(NullModel), CacheConfig::default(), DispatchPolicy::default())
    }

    #[test]
    fn slot_moves_through_states() {
        let cache = cache();
        let op = Operation::Len;
        let key = TypeKey::Builtin(Type::List);
        assert_eq!(cache.slot_state(&op, key), SlotState::Empty);
        cache.resolve(&op, key);
        assert_eq!(cache.slot_state(&op, key), SlotState::Cached);
        cache.invalidate_all();
        assert_eq!(cache.slot_state(&op, key), SlotState::Stale);
        cache.resolve(&op, key);
        assert_eq!(cache.slot_state(&op, key), SlotState::Cached);
    }

    #[test]
    fn numeric_limit_change_keeps_thunks() {
        let cache = cache();
        let op = Operation::Binary(BinaryOp::Add);
        let key = TypeKey::Builtin(Type::Int);
        let first = cache.resolve(&op, key);
        cache.set_recursion_limit(Some(50));
        assert!(Arc::ptr_eq(&first, &cache.resolve(&op, key)));
        cache.set_recursion_limit(None);
        let rebuilt = cache.resolve(&op, key);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert!(!rebuilt.is_depth_limited());
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = cache();
        let key = TypeKey::Builtin(Type::Dict);
        for _ in 0..3 {
            cache.resolve(&Operation::Len, key);
        }
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.resolutions), (2, 1, 1));
        assert!((stats.hit_rate() - 66.666).abs() < 0.01);
    }
}
