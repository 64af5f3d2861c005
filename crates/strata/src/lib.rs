#![doc = include_str!("../../../README.md")]

mod args;
pub mod dispatch;
mod exception;
mod object_model;
mod py_hash;
mod resource;
mod runtime;
mod sync;
pub mod tracer;
pub mod types;
mod value;

pub use crate::{
    exception::{ErrorKind, ExcType, RunError, RunResult, SimpleException},
    object_model::{NullModel, ObjectModel, ValueIter},
    py_hash::{TupleHasher, hash_bytes, hash_float, hash_int, hash_str},
    resource::{DEFAULT_MAX_RECURSION_DEPTH, MAX_DATA_RECURSION_DEPTH, dispatch_depth},
    runtime::Runtime,
    sync::{Monitor, MonitorGuard, ObjectId, OrderedLocker},
    tracer::{DispatchTracer, LogTracer, NoopTracer, RecordingTracer, TraceEvent},
    value::{ClassId, NativeFn, NativeFunction, Object, Value},
};
