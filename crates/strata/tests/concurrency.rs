/// Containers and the dispatch cache shared between threads.
///
/// Pairwise operations take both containers' locks in a global order, so
/// `a == b` racing `b == a` must never deadlock.
use std::thread;

use pretty_assertions::assert_eq;
use strata::{
    Runtime, Value,
    dispatch::{BinaryOp, CompareOp},
    types::{Dict, List},
};

mod common;

const ROUNDS: usize = 10_000;

fn list_of(n: i64) -> List {
    List::from_vec((0..n).map(Value::Int).collect())
}

/// Opposite-order comparisons on the same pair finish with negated results.
#[test]
fn opposite_order_comparisons_do_not_deadlock() {
    common::init_logging();
    let rt = Runtime::new();
    let a = Value::List(list_of(16));
    let b = list_of(15);
    b.append(Value::Int(99));
    let b = Value::List(b);
    thread::scope(|s| {
        let forward = s.spawn(|| (0..ROUNDS).all(|_| rt.less_than(&a, &b).unwrap()));
        let backward = s.spawn(|| (0..ROUNDS).all(|_| !rt.less_than(&b, &a).unwrap()));
        let equal = s.spawn(|| (0..ROUNDS).all(|_| !rt.compare_bool(CompareOp::Eq, &b, &a).unwrap()));
        assert!(forward.join().unwrap());
        assert!(backward.join().unwrap());
        assert!(equal.join().unwrap());
    });
}

/// `a + b` racing `b + a` always sees both operands whole.
#[test]
fn opposite_order_concatenation() {
    let rt = Runtime::new();
    let a = Value::List(list_of(8));
    let b = Value::List(list_of(4));
    thread::scope(|s| {
        let ab = s.spawn(|| {
            (0..ROUNDS).all(|_| rt.len(&rt.binary_op(BinaryOp::Add, &a, &b).unwrap()).unwrap() == 12)
        });
        let ba = s.spawn(|| {
            (0..ROUNDS).all(|_| rt.len(&rt.binary_op(BinaryOp::Add, &b, &a).unwrap()).unwrap() == 12)
        });
        assert!(ab.join().unwrap());
        assert!(ba.join().unwrap());
    });
}

/// Appends from several threads are all kept.
#[test]
fn concurrent_appends() {
    let rt = Runtime::new();
    let list = List::new();
    thread::scope(|s| {
        for t in 0..4 {
            let list = &list;
            let rt = &rt;
            s.spawn(move || {
                for i in 0..1000 {
                    rt.call_method(&Value::List(list.clone()), "append", &[Value::Int(t * 1000 + i)])
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(list.len(), 4000);
    let mut seen: Vec<i64> = list.to_vec().iter().map(|v| v.as_int().unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..4000).collect::<Vec<_>>());
}

/// Disjoint writers and concurrent readers leave every key in place.
#[test]
fn concurrent_dict_writers() {
    let rt = Runtime::new();
    let dict = Dict::new();
    thread::scope(|s| {
        for t in 0..4_i64 {
            let (dict, rt) = (&dict, &rt);
            s.spawn(move || {
                for i in 0..500 {
                    let key = t * 500 + i;
                    dict.set(rt, Value::Int(key), Value::Int(-key)).unwrap();
                    assert_eq!(dict.get(rt, &Value::Int(key)).unwrap().and_then(|v| v.as_int()), Some(-key));
                }
            });
        }
    });
    assert_eq!(dict.len(), 2000);
}

/// Invalidation racing lookups never hands out a wrong thunk.
#[test]
fn invalidation_during_dispatch() {
    common::init_logging();
    let rt = Runtime::new();
    let list = Value::List(list_of(3));
    let text = Value::str("four");
    thread::scope(|s| {
        let invalidator = s.spawn(|| {
            for _ in 0..500 {
                rt.dispatch().invalidate_all();
            }
        });
        for _ in 0..2 {
            s.spawn(|| {
                for _ in 0..ROUNDS {
                    assert_eq!(rt.len(&list).unwrap(), 3);
                    assert_eq!(rt.len(&text).unwrap(), 4);
                }
            });
        }
        invalidator.join().unwrap();
    });
    assert_eq!(rt.dispatch().stats().invalidations, 500);
}
