//! Operation dispatch: resolving `(operation, receiver type)` to a callable thunk.
//!
//! Every container operation goes through a [`DispatchCache`]. The cache maps
//! an [`Operation`] and a [`crate::types::TypeKey`] to a [`Thunk`] built under
//! the current world version. Anything that changes what a slot resolves to
//! (a class gaining a method, tracing being switched on) bumps the version,
//! which makes every existing thunk stale. Registered [`CallSite`]s are also
//! marked stale through a lock-free registry of weak handles that is swept as
//! sites die.

pub(crate) mod builtins;
mod cache;
mod operation;
mod policy;
mod site;
pub(crate) mod thunk;
pub(crate) mod world;

pub use cache::{CacheStats, DispatchCache, SlotState};
pub use operation::{BinaryOp, CompareOp, Operation, UnaryOp};
pub use policy::{CacheConfig, DispatchPolicy};
pub use site::CallSite;
pub use thunk::Thunk;

use crate::{exception::RunResult, runtime::Runtime, value::Value};

/// A builtin slot taking the receiver as `args[0]`.
pub type BuiltinFn = fn(&Runtime, &[Value]) -> RunResult<Value>;

/// A builtin rich comparison; one function serves all six operators.
pub type CompareFn = fn(&Runtime, CompareOp, &[Value]) -> RunResult<Value>;

/// A slot implemented in this crate.
#[derive(Clone, Copy)]
pub(crate) enum Builtin {
    Fn(BuiltinFn),
    Compare(CompareFn, CompareOp),
}
