/// Tests for the dispatch cache: hits and misses, world-version invalidation,
/// call sites, the weak registry, tracing and the dispatch depth limit.
use std::sync::{
    Arc,
    atomic::{AtomicI64, AtomicUsize, Ordering},
};

use pretty_assertions::assert_eq;
use strata::{
    ClassId, ErrorKind, ExcType, NativeFunction, NullModel, Object, ObjectModel, RecordingTracer, Runtime, TraceEvent,
    Value,
    dispatch::{BinaryOp, CacheConfig, DispatchPolicy, Operation, SlotState},
    dispatch_depth,
    types::{List, Type, TypeKey},
};

mod common;

const METERS: ClassId = ClassId(1);
const DEEP: ClassId = ClassId(2);

/// A model whose `__add__` bakes in the current `offset` at resolution time
/// and counts how often it is resolved.
#[derive(Debug, Default)]
struct CountingModel {
    add_resolutions: AtomicUsize,
    offset: AtomicI64,
}

fn meters(n: i64) -> Value {
    Value::Object(Object::new(METERS, n))
}

fn meters_of(value: &Value) -> i64 {
    match value {
        Value::Object(obj) => obj.payload::<i64>().copied().unwrap_or_default(),
        other => other.as_int().unwrap_or_default(),
    }
}

impl ObjectModel for CountingModel {
    fn class_name(&self, class: ClassId) -> String {
        match class {
            METERS => "Meters".to_owned(),
            _ => "Deep".to_owned(),
        }
    }

    fn resolve_slot(&self, class: ClassId, name: &str) -> Option<Value> {
        let func = match (class, name) {
            (METERS, "__add__" | "__radd__") => {
                self.add_resolutions.fetch_add(1, Ordering::SeqCst);
                let offset = self.offset.load(Ordering::SeqCst);
                NativeFunction::new(name, move |_rt, args| {
                    Ok(Value::Int(meters_of(&args[0]) + meters_of(&args[1]) + offset))
                })
            }
            (METERS, "unit") => return Some(Value::str("m")),
            (DEEP, "__len__") => NativeFunction::new("__len__", |rt, args| rt.len(&args[0]).map(Value::from_usize)),
            _ => return None,
        };
        Some(Value::Native(func))
    }
}

fn counting_runtime() -> (Arc<CountingModel>, Runtime) {
    common::init_logging();
    let model = Arc::new(CountingModel::default());
    let rt = Runtime::with_model(model.clone());
    (model, rt)
}

fn list_key() -> TypeKey {
    TypeKey::Builtin(Type::List)
}

// =============================================================================
// Resolution and invalidation
// =============================================================================

/// The first lookup misses, the following ones hit the same thunk.
#[test]
fn repeated_lookups_hit() {
    common::init_logging();
    let rt = Runtime::new();
    let list = Value::List(List::from_vec(vec![Value::Int(1)]));
    assert_eq!(rt.dispatch().slot_state(&Operation::Len, list_key()), SlotState::Empty);
    let first = rt.resolve(&Operation::Len, &list);
    let second = rt.resolve(&Operation::Len, &list);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(rt.dispatch().slot_state(&Operation::Len, list_key()), SlotState::Cached);

    let stats = rt.dispatch().stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert!((stats.hit_rate() - 50.0).abs() < f64::EPSILON);
}

/// Cached thunks survive model changes until the world is invalidated.
#[test]
fn type_change_forces_reresolution() {
    let (model, rt) = counting_runtime();
    assert_eq!(rt.binary_op(BinaryOp::Add, &meters(2), &meters(3)).unwrap().as_int(), Some(5));
    assert_eq!(rt.binary_op(BinaryOp::Add, &meters(2), &meters(3)).unwrap().as_int(), Some(5));
    assert_eq!(model.add_resolutions.load(Ordering::SeqCst), 1);

    model.offset.store(100, Ordering::SeqCst);
    assert_eq!(rt.binary_op(BinaryOp::Add, &meters(2), &meters(3)).unwrap().as_int(), Some(5));

    let before = rt.dispatch().version();
    rt.dispatch().notify_type_changed(METERS);
    assert_eq!(rt.dispatch().version(), before + 1);
    let key = TypeKey::Class(METERS);
    assert_eq!(rt.dispatch().slot_state(&Operation::Binary(BinaryOp::Add), key), SlotState::Stale);
    assert_eq!(rt.binary_op(BinaryOp::Add, &meters(2), &meters(3)).unwrap().as_int(), Some(105));
    assert_eq!(model.add_resolutions.load(Ordering::SeqCst), 2);

    model.offset.store(0, Ordering::SeqCst);
    rt.dispatch().invalidate_all();
    assert_eq!(rt.binary_op(BinaryOp::Add, &meters(2), &meters(3)).unwrap().as_int(), Some(5));
    assert_eq!(model.add_resolutions.load(Ordering::SeqCst), 3);
}

/// A thunk obtained before invalidation still runs, but carries the old version.
#[test]
fn stale_thunk_remains_callable() {
    let (_model, rt) = counting_runtime();
    let op = Operation::Binary(BinaryOp::Add);
    let thunk = rt.resolve(&op, &meters(1));
    rt.dispatch().invalidate_all();
    assert!(thunk.version() < rt.dispatch().version());
    assert_eq!(thunk.call(&rt, &[meters(1), meters(1)]).unwrap().as_int(), Some(2));
    let fresh = rt.resolve(&op, &meters(1));
    assert!(!Arc::ptr_eq(&thunk, &fresh));
    assert_eq!(fresh.version(), rt.dispatch().version());
}

/// An `int` left operand falls through to the class's `__radd__`.
#[test]
fn reflected_operator_on_model_class() {
    let (_model, rt) = counting_runtime();
    assert_eq!(rt.binary_op(BinaryOp::Add, &Value::Int(4), &meters(3)).unwrap().as_int(), Some(7));
    let err = rt.binary_op(BinaryOp::Sub, &Value::Int(4), &meters(3)).unwrap_err();
    assert_eq!(
        err.message(),
        Some("unsupported operand type(s) for -: 'int' and 'Meters'")
    );
}

/// Missing slots raise the CPython-style error for their operation.
#[test]
fn missing_slots() {
    let (_model, rt) = counting_runtime();
    let err = rt.len(&meters(1)).unwrap_err();
    assert_eq!(err.message(), Some("object of type 'Meters' has no len()"));
    let err = rt.get_member(&meters(1), "volume").unwrap_err();
    assert!(err.is_exception_type(ExcType::AttributeError));
    assert_eq!(err.message(), Some("'Meters' object has no attribute 'volume'"));
    assert_eq!(rt.get_member(&meters(1), "unit").unwrap().as_str(), Some("m"));
    assert!(rt.hash(&meters(1)).is_ok());
}

// =============================================================================
// Call sites and the registry
// =============================================================================

/// Invalidation marks live sites stale; their next call recomputes.
#[test]
fn call_site_recomputes_after_invalidation() {
    common::init_logging();
    let rt = Runtime::new();
    let site = rt.dispatch().call_site(Operation::Len);
    let list = Value::List(List::from_vec(vec![Value::Int(1), Value::Int(2)]));
    assert_eq!(site.call(&rt, std::slice::from_ref(&list)).unwrap().as_int(), Some(2));
    assert!(!site.is_stale());
    assert_eq!(site.recomputes(), 0);

    rt.dispatch().invalidate_all();
    assert!(site.is_stale());
    assert_eq!(site.call(&rt, std::slice::from_ref(&list)).unwrap().as_int(), Some(2));
    assert!(!site.is_stale());
    assert_eq!(site.recomputes(), 1);

    let text = Value::str("abc");
    assert_eq!(site.call(&rt, &[text]).unwrap().as_int(), Some(3));
    assert_eq!(site.recomputes(), 2);
}

/// Dropped sites are reclaimed by a sweep and no longer walked.
#[test]
fn sweep_reclaims_dropped_sites() {
    common::init_logging();
    let config = CacheConfig {
        initial_cleanup_threshold: 1_000_000,
        background_sweep: false,
        ..CacheConfig::default()
    };
    let rt = Runtime::with_config(Arc::new(NullModel), config, DispatchPolicy::default());
    let mut sites: Vec<_> = (0..10).map(|_| rt.dispatch().call_site(Operation::Repr)).collect();
    sites.truncate(4);
    assert_eq!(rt.dispatch().live_sites(), 4);
    assert_eq!(rt.dispatch().sweep_now(), 6);
    assert_eq!(rt.dispatch().sweep_now(), 0);

    let stats = rt.dispatch().stats();
    assert_eq!(stats.reclaimed, 6);
    assert_eq!(stats.sweeps, 2);
    rt.dispatch().invalidate_all();
    assert!(sites.iter().all(|site| site.is_stale()));
}

/// Registrations past the threshold trigger a sweep on their own.
#[test]
fn registration_triggers_inline_sweep() {
    common::init_logging();
    let config = CacheConfig {
        initial_cleanup_threshold: 8,
        background_sweep: false,
        ..CacheConfig::default()
    };
    let rt = Runtime::with_config(Arc::new(NullModel), config, DispatchPolicy::default());
    for _ in 0..50 {
        drop(rt.dispatch().call_site(Operation::Len));
    }
    let stats = rt.dispatch().stats();
    assert!(stats.sweeps > 0);
    assert!(stats.reclaimed > 0);
    assert_eq!(rt.dispatch().live_sites(), 0);
}

// =============================================================================
// Policy: tracing and depth
// =============================================================================

/// Turning tracing on rebuilds thunks with the tracer; turning it off removes it.
#[test]
fn tracing_toggle() {
    common::init_logging();
    let rt = Runtime::new();
    let tracer = Arc::new(RecordingTracer::new());
    rt.dispatch().set_tracer(Some(tracer.clone()));
    let list = Value::List(List::new());
    rt.len(&list).unwrap();
    assert!(tracer.take().is_empty());

    rt.dispatch().set_tracing(true);
    assert_eq!(tracer.take(), vec![TraceEvent::Invalidate { version: 1, walked: 0 }]);
    rt.len(&list).unwrap();
    assert_eq!(
        tracer.take(),
        vec![
            TraceEvent::Resolve {
                op: "__len__".to_owned(),
                type_name: "list".to_owned(),
                hit: false,
            },
            TraceEvent::Call {
                op: "__len__".to_owned(),
                type_name: "list".to_owned(),
                depth: 1,
            },
            TraceEvent::Return {
                op: "__len__".to_owned(),
                depth: 0,
            },
        ]
    );

    rt.dispatch().set_tracing(false);
    rt.len(&list).unwrap();
    assert!(tracer.take().is_empty());
    assert!(!rt.resolve(&Operation::Len, &list).is_traced());
}

/// Unbounded recursion through a model slot raises instead of overflowing.
#[test]
fn recursion_limit_raises() {
    let (_model, rt) = counting_runtime();
    rt.dispatch().set_recursion_limit(Some(40));
    let deep = Value::Object(Object::new(DEEP, ()));
    let err = rt.len(&deep).unwrap_err();
    assert!(err.is_exception_type(ExcType::RecursionError));
    assert_eq!(err.kind(), ErrorKind::Recursion);
    assert_eq!(dispatch_depth(), 0);
}

/// Only switching between limited and unlimited changes the thunk shape.
#[test]
fn numeric_limit_change_keeps_version() {
    common::init_logging();
    let rt = Runtime::new();
    let version = rt.dispatch().version();
    rt.dispatch().set_recursion_limit(Some(50));
    assert_eq!(rt.dispatch().version(), version);
    rt.dispatch().set_recursion_limit(None);
    assert_eq!(rt.dispatch().version(), version + 1);
    assert!(!rt.resolve(&Operation::Len, &Value::List(List::new())).is_depth_limited());
}
