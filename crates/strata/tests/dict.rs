/// Tests for `dict` and its live views: lookup, insertion order, the
/// iteration fault, view membership and view set algebra.
use std::sync::Arc;

use pretty_assertions::assert_eq;
use strata::{
    ClassId, ErrorKind, ExcType, NativeFunction, Object, ObjectModel, Runtime, Value,
    dispatch::{BinaryOp, CompareOp},
    types::{Dict, List},
};

fn int_dict(rt: &Runtime, pairs: &[(i64, i64)]) -> Dict {
    Dict::from_pairs(rt, pairs.iter().map(|&(k, v)| (Value::Int(k), Value::Int(v)))).unwrap()
}

fn keys(dict: &Dict) -> Vec<i64> {
    dict.keys_vec().iter().map(|k| k.as_int().unwrap()).collect()
}

// =============================================================================
// Mapping basics
// =============================================================================

/// Iteration follows insertion order; overwriting keeps the original slot.
#[test]
fn insertion_order_survives_overwrite() {
    let rt = Runtime::new();
    let dict = int_dict(&rt, &[(3, 0), (1, 0), (2, 0)]);
    dict.set(&rt, Value::Int(1), Value::Int(10)).unwrap();
    assert_eq!(keys(&dict), vec![3, 1, 2]);
    dict.delete(&rt, &Value::Int(3)).unwrap();
    dict.set(&rt, Value::Int(3), Value::Int(30)).unwrap();
    assert_eq!(keys(&dict), vec![1, 2, 3]);
    assert_eq!(rt.repr(&Value::Dict(dict)).unwrap(), "{1: 10, 2: 0, 3: 30}");
}

/// A missing key raises KeyError carrying the key's repr.
#[test]
fn missing_key_error() {
    let rt = Runtime::new();
    let dict = Dict::new();
    let err = dict.get_item(&rt, &Value::str("nope")).unwrap_err();
    assert!(err.is_exception_type(ExcType::KeyError));
    assert_eq!(err.kind(), ErrorKind::KeyMissing);
    assert_eq!(err.message(), Some("'nope'"));
    assert!(dict.delete(&rt, &Value::Int(1)).is_err());
    assert_eq!(dict.pop(&rt, &Value::Int(1), Some(Value::Int(5))).unwrap().as_int(), Some(5));
}

/// Unhashable keys are rejected before the dict is touched.
#[test]
fn unhashable_key_rejected() {
    let rt = Runtime::new();
    let dict = Dict::new();
    let err = dict.set(&rt, Value::List(List::new()), Value::None).unwrap_err();
    assert_eq!(err.message(), Some("unhashable type: 'list'"));
    assert!(dict.is_empty());
}

/// `1`, `1.0` and `True` are the same key.
#[test]
fn numeric_keys_collapse() {
    let rt = Runtime::new();
    let dict = Dict::new();
    dict.set(&rt, Value::Int(1), Value::str("int")).unwrap();
    dict.set(&rt, Value::Float(1.0), Value::str("float")).unwrap();
    dict.set(&rt, Value::Bool(true), Value::str("bool")).unwrap();
    assert_eq!(dict.len(), 1);
    assert_eq!(rt.repr(&Value::Dict(dict)).unwrap(), "{1: 'bool'}");
}

/// `setdefault`, `fromkeys`, `update` and `copy` through method dispatch.
#[test]
fn dict_methods() {
    let rt = Runtime::new();
    let value = Value::Dict(Dict::new());
    let got = rt.call_method(&value, "setdefault", &[Value::Int(1), Value::Int(2)]).unwrap();
    assert_eq!(got.as_int(), Some(2));
    let got = rt.call_method(&value, "setdefault", &[Value::Int(1), Value::Int(9)]).unwrap();
    assert_eq!(got.as_int(), Some(2));

    let pairs = Value::List(List::from_vec(vec![Value::tuple(vec![Value::Int(5), Value::Int(6)])]));
    rt.call_method(&value, "update", &[pairs]).unwrap();
    let copy = rt.call_method(&value, "copy", &[]).unwrap();
    rt.call_method(&value, "clear", &[]).unwrap();
    assert_eq!(rt.repr(&copy).unwrap(), "{1: 2, 5: 6}");

    let fresh = rt
        .call_method(&value, "fromkeys", &[Value::tuple(vec![Value::str("a"), Value::str("b")])])
        .unwrap();
    assert_eq!(rt.repr(&fresh).unwrap(), "{'a': None, 'b': None}");
}

/// `popitem` on an empty dict raises the CPython KeyError.
#[test]
fn popitem_empty() {
    let err = Dict::new().popitem().unwrap_err();
    assert_eq!(err.message(), Some("'popitem(): dictionary is empty'"));
}

/// Dict equality ignores order; ordering comparisons are unsupported.
#[test]
fn equality_and_ordering() {
    let rt = Runtime::new();
    let a = Value::Dict(int_dict(&rt, &[(1, 1), (2, 2)]));
    let b = Value::Dict(int_dict(&rt, &[(2, 2), (1, 1)]));
    let c = Value::Dict(int_dict(&rt, &[(1, 1), (2, 3)]));
    assert!(rt.equals(&a, &b).unwrap());
    assert!(!rt.equals(&a, &c).unwrap());
    let err = rt.compare(CompareOp::Lt, &a, &b).unwrap_err();
    assert_eq!(
        err.message(),
        Some("'<' not supported between instances of 'dict' and 'dict'")
    );
}

/// A dict containing itself prints `{...}` at the inner level.
#[test]
fn recursive_repr() {
    let rt = Runtime::new();
    let dict = Dict::new();
    dict.set(&rt, Value::str("me"), Value::Dict(dict.clone())).unwrap();
    assert_eq!(rt.repr(&Value::Dict(dict)).unwrap(), "{'me': {...}}");
}

/// `d | other` merges into a copy; `d |= other` updates in place.
#[test]
fn merge_operators() {
    let rt = Runtime::new();
    let a = Value::Dict(int_dict(&rt, &[(1, 1)]));
    let b = Value::Dict(int_dict(&rt, &[(1, 9), (2, 2)]));
    let merged = rt.binary_op(BinaryOp::Or, &a, &b).unwrap();
    assert_eq!(rt.repr(&merged).unwrap(), "{1: 9, 2: 2}");
    assert_eq!(rt.repr(&a).unwrap(), "{1: 1}");
    rt.inplace_op(BinaryOp::Or, &a, &b).unwrap();
    assert_eq!(rt.repr(&a).unwrap(), "{1: 9, 2: 2}");
}

// =============================================================================
// Iteration
// =============================================================================

/// Changing the size during iteration faults on the next step.
#[test]
fn resize_during_iteration_faults() {
    let rt = Runtime::new();
    let dict = int_dict(&rt, &[(1, 1), (2, 2), (3, 3)]);
    let mut it = rt.iterate(&Value::Dict(dict.clone())).unwrap();
    assert_eq!(it.next().unwrap().unwrap().as_int(), Some(1));
    dict.delete(&rt, &Value::Int(3)).unwrap();
    let err = it.next().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContainerMutatedDuringIteration);
    assert!(err.is_exception_type(ExcType::RuntimeError));
}

/// Iterating to completion yields exactly `len` distinct items.
#[test]
fn full_iteration_yields_each_entry_once() {
    let rt = Runtime::new();
    let dict = Dict::new();
    for i in 0..200 {
        dict.set(&rt, Value::Int(i), Value::Int(i * i)).unwrap();
    }
    for i in (0..200).step_by(3) {
        dict.delete(&rt, &Value::Int(i)).unwrap();
    }
    let seen: Vec<i64> = rt
        .iterate(&Value::Dict(dict.clone()))
        .unwrap()
        .map(|k| k.unwrap().as_int().unwrap())
        .collect();
    assert_eq!(seen.len(), dict.len());
    let mut unique = seen.clone();
    unique.dedup();
    assert_eq!(unique, seen);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
}

// =============================================================================
// Views
// =============================================================================

/// Views are live: they see mutations made after they were created.
#[test]
fn views_are_live() {
    let rt = Runtime::new();
    let dict = int_dict(&rt, &[(1, 10)]);
    let keys = dict.keys();
    let values = dict.values();
    dict.set(&rt, Value::Int(2), Value::Int(20)).unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&rt, &Value::Int(2)).unwrap());
    assert!(values.contains(&rt, &Value::Int(20)).unwrap());
    assert_eq!(rt.repr(&Value::DictValues(values)).unwrap(), "dict_values([10, 20])");
}

/// `(k, v) in items` requires the key to be present with an equal value.
#[test]
fn items_membership() {
    let rt = Runtime::new();
    let dict = int_dict(&rt, &[(1, 10), (2, 20)]);
    let items = Value::DictItems(dict.items());
    let pair = |k: i64, v: i64| Value::tuple(vec![Value::Int(k), Value::Int(v)]);
    assert!(rt.contains(&items, &pair(1, 10)).unwrap());
    assert!(!rt.contains(&items, &pair(1, 20)).unwrap());
    assert!(!rt.contains(&items, &pair(3, 30)).unwrap());
    assert!(!rt.contains(&items, &Value::Int(1)).unwrap());
}

/// Keys views support set algebra against any iterable and return frozensets.
#[test]
fn keys_view_algebra() {
    let rt = Runtime::new();
    let a = Value::DictKeys(int_dict(&rt, &[(1, 0), (2, 0), (3, 0)]).keys());
    let b = Value::DictKeys(int_dict(&rt, &[(2, 0), (4, 0)]).keys());
    let other = Value::List(List::from_vec(vec![Value::Int(3), Value::Int(5)]));

    let and = rt.binary_op(BinaryOp::And, &a, &b).unwrap();
    assert_eq!(rt.repr(&and).unwrap(), "frozenset({2})");
    let sub = rt.binary_op(BinaryOp::Sub, &a, &other).unwrap();
    assert!(matches!(&sub, Value::FrozenSet(set) if set.len() == 2));
    let rsub = rt.binary_op(BinaryOp::Sub, &other, &a).unwrap();
    assert_eq!(rt.repr(&rsub).unwrap(), "frozenset({5})");
    let xor = rt.binary_op(BinaryOp::Xor, &a, &b).unwrap();
    assert!(matches!(&xor, Value::FrozenSet(set) if set.len() == 3));

    let err = rt.binary_op(BinaryOp::Or, &a, &Value::Int(1)).unwrap_err();
    assert!(err.is_exception_type(ExcType::TypeError));
}

/// Keys views compare like sets and report `isdisjoint`.
#[test]
fn keys_view_comparison() {
    let rt = Runtime::new();
    let small = Value::DictKeys(int_dict(&rt, &[(1, 0)]).keys());
    let big = Value::DictKeys(int_dict(&rt, &[(1, 0), (2, 0)]).keys());
    assert!(rt.compare_bool(CompareOp::Lt, &small, &big).unwrap());
    assert!(rt.compare_bool(CompareOp::Le, &big, &big).unwrap());
    assert!(!rt.equals(&small, &big).unwrap());
    let disjoint = rt
        .call_method(&small, "isdisjoint", &[Value::tuple(vec![Value::Int(7)])])
        .unwrap();
    assert!(matches!(disjoint, Value::Bool(true)));
}

/// Keys views are unhashable; values views fall back to identity hashing.
#[test]
fn view_hashing() {
    let rt = Runtime::new();
    let dict = int_dict(&rt, &[(1, 1)]);
    assert!(rt.hash(&Value::DictKeys(dict.keys())).is_err());
    assert!(rt.hash(&Value::DictValues(dict.values())).is_ok());
}

// =============================================================================
// Model-defined keys
// =============================================================================

const KEY: ClassId = ClassId(3);

/// Keys whose hash collides in buckets of three and whose equality compares payloads.
#[derive(Debug)]
struct CollidingKeys;

fn payload(value: &Value) -> Option<i64> {
    match value {
        Value::Object(obj) => obj.payload::<i64>().copied(),
        _ => None,
    }
}

impl ObjectModel for CollidingKeys {
    fn class_name(&self, _class: ClassId) -> String {
        "Key".to_owned()
    }

    fn resolve_slot(&self, _class: ClassId, name: &str) -> Option<Value> {
        let func = match name {
            "__hash__" => NativeFunction::new("__hash__", |_rt, args| {
                Ok(Value::Int(payload(&args[0]).unwrap_or_default() % 3))
            }),
            "__eq__" => NativeFunction::new("__eq__", |_rt, args| match (payload(&args[0]), payload(&args[1])) {
                (Some(a), Some(b)) => Ok(Value::Bool(a == b)),
                _ => Ok(Value::NotImplemented),
            }),
            "__repr__" => NativeFunction::new("__repr__", |_rt, args| {
                Ok(Value::str(&format!("Key({})", payload(&args[0]).unwrap_or_default())))
            }),
            _ => return None,
        };
        Some(Value::Native(func))
    }
}

/// Colliding model keys are told apart by `__eq__`, found after copies are made.
#[test]
fn model_keys_use_hash_and_eq_slots() {
    let rt = Runtime::with_model(Arc::new(CollidingKeys));
    let key = |n: i64| Value::Object(Object::new(KEY, n));
    let dict = Dict::new();
    for n in 0..9 {
        dict.set(&rt, key(n), Value::Int(n * 100)).unwrap();
    }
    assert_eq!(dict.len(), 9);
    assert_eq!(dict.get(&rt, &key(7)).unwrap().and_then(|v| v.as_int()), Some(700));
    dict.set(&rt, key(7), Value::Int(-7)).unwrap();
    assert_eq!(dict.len(), 9);
    assert_eq!(dict.get(&rt, &key(7)).unwrap().and_then(|v| v.as_int()), Some(-7));
    assert!(dict.get(&rt, &key(42)).unwrap().is_none());

    let err = dict.get_item(&rt, &key(42)).unwrap_err();
    assert_eq!(err.message(), Some("Key(42)"));
}
