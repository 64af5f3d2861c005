//! Resolved, directly invocable dispatch targets.

use std::{fmt, sync::Arc};

use crate::{
    dispatch::{Builtin, Operation},
    exception::{ExcType, RunResult},
    resource::{DepthGuard, dispatch_depth},
    runtime::Runtime,
    tracer::DispatchTracer,
    types::TypeKey,
    value::Value,
};

/// What a thunk runs.
#[derive(Clone)]
pub(crate) enum Target {
    /// A slot implemented in this crate.
    Builtin(Builtin),
    /// A callable resolved through the object model; invoked with the receiver first.
    Slot(Value),
    /// A class attribute read by `GetMember`; returned as is.
    Attribute(Value),
    /// The type has no such slot.
    Missing,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(_) => f.write_str("Builtin"),
            Self::Slot(value) => f.debug_tuple("Slot").field(value).finish(),
            Self::Attribute(value) => f.debug_tuple("Attribute").field(value).finish(),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

/// A cached dispatch decision for one `(operation, type)` pair.
///
/// The thunk is stamped with the world version it was built under and bakes
/// in the policy of that moment: a depth guard when a recursion limit was
/// set, tracer hooks when tracing was on.
#[derive(Debug)]
pub struct Thunk {
    op: Operation,
    type_key: TypeKey,
    type_name: Arc<str>,
    target: Target,
    version: u64,
    limited: bool,
    tracer: Option<Arc<dyn DispatchTracer>>,
}

impl Thunk {
    pub(crate) fn new(
        op: Operation,
        type_key: TypeKey,
        type_name: Arc<str>,
        target: Target,
        version: u64,
        limited: bool,
        tracer: Option<Arc<dyn DispatchTracer>>,
    ) -> Self {
        Self {
            op,
            type_key,
            type_name,
            target,
            version,
            limited,
            tracer,
        }
    }

    #[must_use]
    pub fn op(&self) -> &Operation {
        &self.op
    }

    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// World version this thunk was built under.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when the type has no slot for the operation.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self.target, Target::Missing)
    }

    #[must_use]
    pub fn is_traced(&self) -> bool {
        self.tracer.is_some()
    }

    #[must_use]
    pub fn is_depth_limited(&self) -> bool {
        self.limited
    }

    pub(crate) fn tracer(&self) -> Option<&Arc<dyn DispatchTracer>> {
        self.tracer.as_ref()
    }

    /// Runs the target with `args[0]` as the receiver.
    pub fn call(&self, rt: &Runtime, args: &[Value]) -> RunResult<Value> {
        let guard = if self.limited {
            Some(DepthGuard::enter(rt.dispatch().recursion_limit())?)
        } else {
            None
        };
        let Some(tracer) = &self.tracer else {
            return self.run(rt, args);
        };
        let depth = guard.as_ref().map_or_else(dispatch_depth, DepthGuard::depth);
        tracer.on_call(&self.op, &self.type_name, depth);
        let result = self.run(rt, args);
        tracer.on_return(&self.op, depth.saturating_sub(1));
        result
    }

    fn run(&self, rt: &Runtime, args: &[Value]) -> RunResult<Value> {
        match &self.target {
            Target::Builtin(Builtin::Fn(func)) => func(rt, args),
            Target::Builtin(Builtin::Compare(func, op)) => func(rt, *op, args),
            Target::Slot(callable) => rt.invoke(callable, args),
            Target::Attribute(value) => Ok(value.clone()),
            Target::Missing => self.missing(),
        }
    }

    /// Outcome of an operation the type does not implement.
    fn missing(&self) -> RunResult<Value> {
        let name = &*self.type_name;
        match &self.op {
            Operation::Binary(_)
            | Operation::ReflectedBinary(_)
            | Operation::InPlace(_)
            | Operation::Compare(_)
            | Operation::Unary(_) => Ok(Value::NotImplemented),
            Operation::GetMember(attr) | Operation::InvokeMember(attr) => Err(ExcType::attribute_error(name, attr)),
            Operation::GetItem => Err(ExcType::type_error_unsupported(name, "is not subscriptable")),
            Operation::SetItem => Err(ExcType::type_error_unsupported(name, "does not support item assignment")),
            Operation::DelItem => Err(ExcType::type_error_unsupported(name, "doesn't support item deletion")),
            Operation::Len => Err(ExcType::type_error(format!("object of type '{name}' has no len()"))),
            Operation::Call => Err(ExcType::type_error_not_callable(name)),
            Operation::Hash => Err(ExcType::type_error_unhashable(name)),
            Operation::Contains => Err(ExcType::type_error(format!(
                "argument of type '{name}' is not iterable"
            ))),
            Operation::Bool | Operation::Repr => Err(ExcType::type_error_unsupported(
                name,
                &format!("has no {}", self.op.slot_name()),
            )),
        }
    }
}
