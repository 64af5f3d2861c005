//! Knobs that shape how thunks are built and how the registry is swept.

use serde::{Deserialize, Serialize};

use crate::resource::DEFAULT_MAX_RECURSION_DEPTH;

/// Policy every thunk reads at build time.
///
/// Toggling `tracing`, or moving `recursion_limit` between `None` and `Some`,
/// changes the shape of every thunk and therefore bumps the world version.
/// Changing the numeric limit does not: limited thunks read it per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    pub tracing: bool,
    /// Maximum dispatch depth; `None` means unlimited.
    pub recursion_limit: Option<usize>,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            tracing: false,
            recursion_limit: Some(DEFAULT_MAX_RECURSION_DEPTH),
        }
    }
}

impl DispatchPolicy {
    /// Whether switching from `self` to `next` invalidates built thunks.
    #[must_use]
    pub fn reshapes(&self, next: &Self) -> bool {
        self.tracing != next.tracing || self.recursion_limit.is_some() != next.recursion_limit.is_some()
    }
}

/// Tuning for the weak call-site registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Registrations before the first sweep, and after a sweep that leaves nothing alive.
    pub initial_cleanup_threshold: usize,
    /// Fraction of registered sites each sweep aims to reclaim.
    pub removal_goal: f64,
    /// Added to the threshold when a sweep reclaims too little to retune from.
    pub cleanup_backoff: usize,
    /// Sweep on a helper thread; when false, the registering thread sweeps inline.
    pub background_sweep: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_cleanup_threshold: 200,
            removal_goal: 0.5,
            cleanup_backoff: 500,
            background_sweep: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shape_changes_reshape() {
        let base = DispatchPolicy::default();
        let deeper = DispatchPolicy {
            recursion_limit: Some(5000),
            ..base
        };
        let unlimited = DispatchPolicy {
            recursion_limit: None,
            ..base
        };
        let traced = DispatchPolicy { tracing: true, ..base };
        assert!(!base.reshapes(&deeper));
        assert!(base.reshapes(&unlimited));
        assert!(base.reshapes(&traced));
    }

    #[test]
    fn policy_round_trips_through_json() {
        let policy = DispatchPolicy {
            tracing: true,
            recursion_limit: None,
        };
        let text = serde_json::to_string(&policy).unwrap();
        assert_eq!(serde_json::from_str::<DispatchPolicy>(&text).unwrap(), policy);
    }
}
