/// Tests for `list` semantics: growth, slicing, sorting and mutation guards.
///
/// Everything here goes through the public `List` API or through the runtime's
/// operator entry points, the same way an interpreter would drive it.
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata::{
    ClassId, ErrorKind, ExcType, NativeFunction, Object, ObjectModel, Runtime, Value,
    dispatch::{BinaryOp, CompareOp},
    types::{List, Slice},
};

mod common;

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

fn contents(list: &List) -> Vec<i64> {
    list.to_vec().iter().map(|v| v.as_int().expect("int element")).collect()
}

// =============================================================================
// Growth
// =============================================================================

/// Appending N elements keeps `capacity >= len` and reallocates O(log N) times.
#[test]
fn append_growth_is_geometric() {
    let list = List::new();
    assert_eq!(list.capacity(), 0);
    for n in 1..=10_000_i64 {
        list.append(Value::Int(n));
        assert!(list.capacity() >= list.len(), "capacity fell behind at {n}");
    }
    assert_eq!(list.len(), 10_000);
    let bound = 2 * (usize::BITS - 10_000_usize.leading_zeros()) as usize + 2;
    assert!(
        list.reallocations() <= bound,
        "{} reallocations for 10k appends",
        list.reallocations()
    );
}

/// The first growth of an empty list allocates four slots.
#[test]
fn first_growth_allocates_four() {
    let list = List::new();
    list.append(Value::Int(1));
    assert_eq!(list.capacity(), 4);
    for n in 2..=5 {
        list.append(Value::Int(n));
    }
    assert_eq!(list.capacity(), 12);
}

/// `trim_excess` is the only way capacity shrinks.
#[test]
fn trim_excess_shrinks_to_length() {
    let list = List::from_vec(ints(&[1, 2, 3, 4, 5, 6]));
    list.append(Value::Int(7));
    assert!(list.capacity() > 7);
    list.clear();
    assert!(list.capacity() > 0);
    list.trim_excess();
    assert_eq!(list.capacity(), 0);
}

// =============================================================================
// Indexing
// =============================================================================

/// Negative indices wrap once; anything further out is an IndexError.
#[test]
fn index_bounds() {
    let list = List::from_vec(ints(&[10, 20, 30]));
    assert_eq!(list.get(-1).unwrap().as_int(), Some(30));
    let err = list.get(3).unwrap_err();
    assert_eq!(err.message(), Some("list index out of range"));
    assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
    let err = list.set(-4, Value::None).unwrap_err();
    assert_eq!(err.message(), Some("list assignment index out of range"));
}

/// `insert` clamps out-of-range positions to either end.
#[test]
fn insert_clamps() {
    let list = List::from_vec(ints(&[1, 2]));
    list.insert(-100, Value::Int(0));
    list.insert(100, Value::Int(3));
    assert_eq!(contents(&list), vec![0, 1, 2, 3]);
}

/// `pop` on an empty list and `pop` past the end raise distinct messages.
#[test]
fn pop_errors() {
    let list = List::new();
    assert_eq!(list.pop(None).unwrap_err().message(), Some("pop from empty list"));
    list.append(Value::Int(1));
    assert_eq!(list.pop(Some(5)).unwrap_err().message(), Some("pop index out of range"));
    assert_eq!(list.pop(Some(-1)).unwrap().as_int(), Some(1));
}

/// `remove` and `index` report a missing value as ValueError.
#[test]
fn remove_and_index_missing() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[1, 2, 1]));
    list.remove(&rt, &Value::Int(1)).unwrap();
    assert_eq!(contents(&list), vec![2, 1]);
    let err = list.remove(&rt, &Value::Int(9)).unwrap_err();
    assert_eq!(err.message(), Some("list.remove(x): x not in list"));
    assert_eq!(err.kind(), ErrorKind::ValueNotFound);
    assert!(list.index(&rt, &Value::Int(2), Some(1), None).unwrap_err().is_exception_type(ExcType::ValueError));
    assert_eq!(list.index(&rt, &Value::Float(1.0), None, None).unwrap(), 1);
}

// =============================================================================
// Slicing
// =============================================================================

/// Reading a slice yields exactly the elements its indices address.
#[test]
fn slice_matches_indices() {
    let list = List::from_vec(ints(&(0..20).collect::<Vec<_>>()));
    for slice in [
        Slice::range(3, 9),
        Slice::stepped(-3),
        Slice::new(Some(-2), Some(-15), Some(-4)),
        Slice::new(None, Some(100), Some(7)),
    ] {
        let expected: Vec<i64> = slice
            .indices(list.len())
            .unwrap()
            .iter()
            .map(|i| i64::try_from(i).unwrap())
            .collect();
        assert_eq!(contents(&list.get_slice(&slice).unwrap()), expected, "{slice:?}");
    }
}

/// `s[sl] = s[sl]` leaves the list unchanged for both contiguous and extended slices.
#[test]
fn slice_self_assignment_round_trips() {
    let rt = Runtime::new();
    let original: Vec<i64> = (0..12).collect();
    let list = List::from_vec(ints(&original));
    for slice in [Slice::range(2, 7), Slice::stepped(3), Slice::new(Some(10), Some(1), Some(-2))] {
        let part = list.get_slice(&slice).unwrap();
        list.set_slice(&rt, &slice, &Value::List(part)).unwrap();
        assert_eq!(contents(&list), original, "{slice:?}");
    }
}

/// `a[:] = a` drains the source before taking the lock.
#[test]
fn whole_slice_assigned_from_itself() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[1, 2, 3]));
    list.set_slice(&rt, &Slice::default(), &Value::List(list.clone())).unwrap();
    assert_eq!(contents(&list), vec![1, 2, 3]);
}

/// An extended slice only accepts a sequence of the same length.
#[test]
fn extended_slice_length_mismatch() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[0, 1, 2, 3, 4]));
    let err = list
        .set_slice(&rt, &Slice::stepped(2), &Value::List(List::from_vec(ints(&[9]))))
        .unwrap_err();
    assert_eq!(
        err.message(),
        Some("attempt to assign sequence of size 1 to extended slice of size 3")
    );
    assert_eq!(contents(&list), vec![0, 1, 2, 3, 4]);
}

/// Deleting `s[::-1]` empties the list.
#[test]
fn delete_full_reversed_slice() {
    let list = List::from_vec(ints(&[1, 2, 3, 4, 5]));
    list.delete_slice(&Slice::stepped(-1)).unwrap();
    assert!(list.is_empty());
}

/// Positions `s[start:stop:step]` addresses, computed the slow way.
fn naive_positions(start: Option<i64>, stop: Option<i64>, step: i64, len: i64) -> Vec<i64> {
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };
    let mut positions = Vec::new();
    if step > 0 {
        let mut i = start.map_or(0, |s| clamp(s, 0, len));
        let stop = stop.map_or(len, |s| clamp(s, 0, len));
        while i < stop {
            positions.push(i);
            i += step;
        }
    } else {
        let mut i = start.map_or(len - 1, |s| clamp(s, -1, len - 1));
        let stop = stop.map_or(-1, |s| clamp(s, -1, len - 1));
        while i > stop {
            positions.push(i);
            i += step;
        }
    }
    positions
}

/// Negative-step deletion removes the same index set as the naive reference.
#[test]
fn negative_step_deletion_matches_reference() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
    for _ in 0..500 {
        let len: i64 = rng.gen_range(0..40);
        let mut bound = || -> Option<i64> {
            if rng.gen_ratio(4, 5) {
                Some(rng.gen_range(-len - 3..=len + 3))
            } else {
                None
            }
        };
        let start = bound();
        let stop = bound();
        let step = -rng.gen_range(1..=5_i64);

        let list = List::from_vec(ints(&(0..len).collect::<Vec<_>>()));
        list.delete_slice(&Slice::new(start, stop, Some(step))).unwrap();

        let removed = naive_positions(start, stop, step, len);
        let expected: Vec<i64> = (0..len).filter(|i| !removed.contains(i)).collect();
        assert_eq!(contents(&list), expected, "len={len} [{start:?}:{stop:?}:{step}]");
    }
}

/// A zero step is rejected for reads, writes and deletes alike.
#[test]
fn zero_step_rejected() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[1]));
    let zero = Slice::stepped(0);
    assert!(list.get_slice(&zero).unwrap_err().is_exception_type(ExcType::ValueError));
    assert!(list.delete_slice(&zero).is_err());
    assert!(list.set_slice(&rt, &zero, &Value::List(List::new())).is_err());
}

// =============================================================================
// Sorting
// =============================================================================

fn first_of_pair() -> Value {
    Value::Native(NativeFunction::new("first", |_rt, args| match args.first() {
        Some(Value::Tuple(items)) => Ok(items[0].clone()),
        _ => Err(ExcType::type_error("expected a pair")),
    }))
}

/// Equal keys keep their original relative order, in both directions.
#[test]
fn sort_is_stable() {
    let rt = Runtime::new();
    let keys = [3, 1, 3, 2, 1, 3, 2];
    let pairs: Vec<Value> = keys
        .iter()
        .enumerate()
        .map(|(i, &k)| Value::tuple(vec![Value::Int(k), Value::Int(i64::try_from(i).unwrap())]))
        .collect();

    let order = |list: &List| -> Vec<i64> {
        list.to_vec()
            .iter()
            .map(|pair| match pair {
                Value::Tuple(items) => items[1].as_int().unwrap(),
                _ => unreachable!(),
            })
            .collect()
    };

    let list = List::from_vec(pairs.clone());
    list.sort(&rt, Some(&first_of_pair()), false).unwrap();
    assert_eq!(order(&list), vec![1, 4, 3, 6, 0, 2, 5]);

    let list = List::from_vec(pairs);
    list.sort(&rt, Some(&first_of_pair()), true).unwrap();
    assert_eq!(order(&list), vec![0, 2, 5, 3, 6, 1, 4]);
}

/// Mixed int and float elements sort numerically.
#[test]
fn sort_mixed_numbers() {
    let rt = Runtime::new();
    let list = List::from_vec(vec![Value::Float(2.5), Value::Int(1), Value::Bool(true), Value::Int(-3)]);
    list.sort(&rt, None, false).unwrap();
    assert_eq!(rt.repr(&Value::List(list)).unwrap(), "[-3, 1, True, 2.5]");
}

/// Unorderable elements raise TypeError and leave the contents intact.
#[test]
fn sort_type_error_restores_contents() {
    let rt = Runtime::new();
    let list = List::from_vec(vec![Value::Int(2), Value::str("a"), Value::Int(1)]);
    let err = list.sort(&rt, None, false).unwrap_err();
    assert!(err.is_exception_type(ExcType::TypeError));
    assert!(err.message().unwrap().starts_with("'<' not supported between instances of"));
    assert_eq!(list.len(), 3);
    assert_eq!(list.get(0).unwrap().as_int(), Some(2));
}

/// A key function that appends to the list aborts with the mutation fault.
#[test]
fn key_function_mutation_is_detected() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[3, 1, 2]));
    let target = list.clone();
    let key = Value::Native(NativeFunction::new("meddle", move |_rt, args| {
        target.append(Value::Int(0));
        Ok(args[0].clone())
    }));
    let err = list.sort(&rt, Some(&key), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContainerMutatedDuringIteration);
    assert_eq!(err.message(), Some("list mutated while determining keys"));
}

/// Model class whose `__lt__` appends to a shared list while comparing payloads.
#[derive(Debug)]
struct MeddlingModel {
    victim: List,
}

const MEDDLER: ClassId = ClassId(7);

impl ObjectModel for MeddlingModel {
    fn resolve_slot(&self, _class: ClassId, name: &str) -> Option<Value> {
        if name != "__lt__" {
            return None;
        }
        let victim = self.victim.clone();
        Some(Value::Native(NativeFunction::new("__lt__", move |_rt, args| {
            let payload = |v: &Value| match v {
                Value::Object(obj) => obj.payload::<i64>().copied(),
                _ => None,
            };
            victim.append(Value::None);
            match (payload(&args[0]), payload(&args[1])) {
                (Some(a), Some(b)) => Ok(Value::Bool(a < b)),
                _ => Ok(Value::NotImplemented),
            }
        })))
    }
}

/// A comparison callback that mutates the list aborts the sort and restores the original order.
#[test]
fn comparison_mutation_restores_original() {
    common::init_logging();
    let list = List::new();
    let rt = Runtime::with_model(Arc::new(MeddlingModel { victim: list.clone() }));
    for payload in [3_i64, 1, 2] {
        list.append(Value::Object(Object::new(MEDDLER, payload)));
    }
    let before: Vec<i64> = list
        .to_vec()
        .iter()
        .map(|v| match v {
            Value::Object(obj) => *obj.payload::<i64>().unwrap(),
            _ => unreachable!(),
        })
        .collect();

    let err = list.sort(&rt, None, false).unwrap_err();
    assert_eq!(err.message(), Some("list mutated during sort"));
    assert_eq!(err.kind(), ErrorKind::ContainerMutatedDuringIteration);

    let after: Vec<i64> = list
        .to_vec()
        .iter()
        .map(|v| match v {
            Value::Object(obj) => *obj.payload::<i64>().unwrap(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(after, before);
}

// =============================================================================
// Operators and protocol
// =============================================================================

/// `+`, `*`, `+=` and `*=` through the runtime's operator entry points.
#[test]
fn arithmetic_operators() {
    let rt = Runtime::new();
    let a = Value::List(List::from_vec(ints(&[1, 2])));
    let b = Value::List(List::from_vec(ints(&[3])));
    assert_eq!(rt.repr(&rt.binary_op(BinaryOp::Add, &a, &b).unwrap()).unwrap(), "[1, 2, 3]");
    assert_eq!(rt.repr(&rt.binary_op(BinaryOp::Mul, &Value::Int(2), &b).unwrap()).unwrap(), "[3, 3]");

    let same = rt.inplace_op(BinaryOp::Add, &a, &Value::tuple(ints(&[4]))).unwrap();
    assert!(same.is_same(&a));
    assert_eq!(rt.repr(&a).unwrap(), "[1, 2, 4]");
    rt.inplace_op(BinaryOp::Mul, &a, &Value::Int(0)).unwrap();
    assert_eq!(rt.len(&a).unwrap(), 0);

    let err = rt.binary_op(BinaryOp::Add, &b, &Value::Int(1)).unwrap_err();
    assert_eq!(
        err.message(),
        Some("unsupported operand type(s) for +: 'list' and 'int'")
    );
}

/// `a.extend(a)` doubles the list instead of looping forever.
#[test]
fn extend_from_itself() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[1, 2]));
    list.extend(&rt, &Value::List(list.clone())).unwrap();
    assert_eq!(contents(&list), vec![1, 2, 1, 2]);
}

/// Ordering is decided by the first mismatching element, then by length.
#[test]
fn lexicographic_ordering() {
    let rt = Runtime::new();
    let a = Value::List(List::from_vec(ints(&[1, 2, 3])));
    let b = Value::List(List::from_vec(ints(&[1, 2, 4])));
    let prefix = Value::List(List::from_vec(ints(&[1, 2])));
    assert!(rt.compare_bool(CompareOp::Lt, &a, &b).unwrap());
    assert!(rt.compare_bool(CompareOp::Gt, &a, &prefix).unwrap());
    assert!(rt.compare_bool(CompareOp::Ne, &a, &b).unwrap());
    assert!(rt.equals(&a, &Value::List(List::from_vec(ints(&[1, 2, 3])))).unwrap());
}

/// Lists are unhashable and print `[...]` when they contain themselves.
#[test]
fn unhashable_and_recursive_repr() {
    let rt = Runtime::new();
    let list = List::from_vec(ints(&[1]));
    let value = Value::List(list.clone());
    list.append(value.clone());
    assert_eq!(rt.repr(&value).unwrap(), "[1, [...]]");
    let err = rt.hash(&value).unwrap_err();
    assert_eq!(err.message(), Some("unhashable type: 'list'"));
}

/// Methods are reachable by name through the dispatch cache.
#[test]
fn methods_dispatch_by_name() {
    let rt = Runtime::new();
    let value = Value::List(List::from_vec(ints(&[1, 2, 2, 3])));
    assert_eq!(rt.call_method(&value, "count", &[Value::Int(2)]).unwrap().as_int(), Some(2));
    rt.call_method(&value, "reverse", &[]).unwrap();
    assert_eq!(rt.call_method(&value, "pop", &[Value::Int(0)]).unwrap().as_int(), Some(3));
    assert!(rt.contains(&value, &Value::Int(1)).unwrap());
    let err = rt.call_method(&value, "frobnicate", &[]).unwrap_err();
    assert_eq!(err.message(), Some("'list' object has no attribute 'frobnicate'"));
}

/// Forward and reversed iterators visit every element once.
#[test]
fn iteration_both_directions() {
    let list = List::from_vec(ints(&[1, 2, 3]));
    let forward: Vec<i64> = list.iter().map(|v| v.unwrap().as_int().unwrap()).collect();
    let backward: Vec<i64> = list.reversed().map(|v| v.unwrap().as_int().unwrap()).collect();
    assert_eq!(forward, vec![1, 2, 3]);
    assert_eq!(backward, vec![3, 2, 1]);
}
