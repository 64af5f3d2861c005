//! The capabilities strata consumes from the surrounding interpreter.
//!
//! Containers and the dispatch cache never know how user classes are laid
//! out. They reach them only through [`ObjectModel`]: slot lookup by name,
//! invocation of non-native callables, and iteration of model objects.
//! Hashing and equality of model objects go through the dispatch cache, which
//! resolves `__hash__`/`__eq__` with [`ObjectModel::resolve_slot`].

use std::fmt;

use crate::{
    exception::{ExcType, RunResult},
    runtime::Runtime,
    value::{ClassId, Value},
};

/// A boxed iterator over values produced by the enumerator protocol.
pub type ValueIter = Box<dyn Iterator<Item = RunResult<Value>> + Send>;

/// The reflective type system strata runs against.
///
/// Implementations must be thread-safe: the dispatch cache calls
/// `resolve_slot` from whichever thread misses the cache.
pub trait ObjectModel: Send + Sync + fmt::Debug {
    /// Name reported in error messages for instances of `class`.
    fn class_name(&self, class: ClassId) -> String {
        format!("object<{}>", class.0)
    }

    /// Looks up the slot `name` (e.g. `__eq__`, `append`) on `class`.
    ///
    /// Returns `None` when the class has no such slot.
    fn resolve_slot(&self, class: ClassId, name: &str) -> Option<Value>;

    /// Invokes a callable that is not a [`crate::NativeFunction`].
    ///
    /// `args` includes the receiver as its first element for slot calls.
    fn invoke(&self, _rt: &Runtime, callable: &Value, _args: &[Value]) -> RunResult<Value> {
        Err(ExcType::type_error_not_callable(callable.py_type()))
    }

    /// Produces an iterator over a model object.
    fn get_enumerator(&self, _rt: &Runtime, value: &Value) -> RunResult<ValueIter> {
        Err(ExcType::type_error_not_iterable(value.py_type()))
    }
}

/// A model with no classes, for runtimes that only handle built-in values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullModel;

impl ObjectModel for NullModel {
    fn resolve_slot(&self, _class: ClassId, _name: &str) -> Option<Value> {
        None
    }
}
