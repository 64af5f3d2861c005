//! The `dict` type: a locked hash mapping with live views.
//!
//! Hashing and key comparison can run user code, so neither happens under the
//! dict's lock. A lookup reads the candidate keys under the lock, releases
//! it, compares, and then re-locks to act; if the dict changed in between (its
//! version moved) the lookup starts over.
//!
//! Iteration follows insertion order. [`DictIter`] snapshots the entry count
//! and the table layout when it is created, and raises `RuntimeError` on the
//! first step after either changes. A delete followed by an insert that
//! leaves every position in place is not detected.

use std::sync::Arc;

use crate::{
    args::ArgValues,
    dispatch::{BinaryOp, Builtin, BuiltinFn, CompareOp, Operation, builtins::unhashable},
    exception::{ExcType, RunError, RunResult},
    resource::{DataDepthGuard, ReprGuard},
    runtime::Runtime,
    sync::{Monitor, ObjectId},
    types::{
        DictItems, DictKeys, DictValues,
        table::{Candidates, ProbeTable},
    },
    value::Value,
};

#[derive(Debug, Default)]
struct DictState {
    table: ProbeTable<Value>,
    version: u64,
}

impl DictState {
    fn table_mut(&mut self) -> &mut ProbeTable<Value> {
        self.version = self.version.wrapping_add(1);
        &mut self.table
    }
}

/// Outcome of a key search, valid while the dict's version is unchanged.
#[derive(Debug, Clone, Copy)]
struct Lookup {
    position: Option<usize>,
    version: u64,
}

/// Python `dict`.
///
/// Cloning the handle shares the mapping.
#[derive(Debug, Clone, Default)]
pub struct Dict(Arc<Monitor<DictState>>);

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dict from `(key, value)` pairs; later duplicates win.
    pub fn from_pairs(rt: &Runtime, pairs: impl IntoIterator<Item = (Value, Value)>) -> RunResult<Self> {
        let dict = Self::new();
        for (key, value) in pairs {
            dict.set(rt, key, value)?;
        }
        Ok(dict)
    }

    /// `dict(source)`: another dict or an iterable of pairs.
    pub fn from_value(rt: &Runtime, source: &Value) -> RunResult<Self> {
        let dict = Self::new();
        dict.update(rt, source)?;
        Ok(dict)
    }

    /// `dict.fromkeys(iterable, value)`
    pub fn fromkeys(rt: &Runtime, iterable: &Value, value: &Value) -> RunResult<Self> {
        let dict = Self::new();
        for key in rt.iterate(iterable)? {
            dict.set(rt, key?, value.clone())?;
        }
        Ok(dict)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read(|s| s.table.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn keys_vec(&self) -> Vec<Value> {
        self.0.read(|s| s.table.iter().map(|e| e.key.clone()).collect())
    }

    #[must_use]
    pub fn values_vec(&self) -> Vec<Value> {
        self.0.read(|s| s.table.iter().map(|e| e.value.clone()).collect())
    }

    /// Snapshot of the entries in iteration order.
    #[must_use]
    pub fn items_vec(&self) -> Vec<(Value, Value)> {
        self.0.read(|s| s.table.iter().map(|e| (e.key.clone(), e.value.clone())).collect())
    }

    /// Snapshot of the entries as `(key, value)` tuples.
    #[must_use]
    pub fn item_tuples(&self) -> Vec<Value> {
        self.0
            .read(|s| s.table.iter().map(|e| Value::tuple(vec![e.key.clone(), e.value.clone()])).collect())
    }

    #[must_use]
    pub fn keys(&self) -> DictKeys {
        DictKeys(self.clone())
    }

    #[must_use]
    pub fn values(&self) -> DictValues {
        DictValues(self.clone())
    }

    #[must_use]
    pub fn items(&self) -> DictItems {
        DictItems(self.clone())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Finds the entry whose key equals `key`.
    ///
    /// Candidates are copied out under the lock and compared with it released.
    fn lookup(&self, rt: &Runtime, key: &Value, hash: u64) -> RunResult<Lookup> {
        loop {
            let (candidates, version): (Candidates, u64) = self.0.read(|s| (s.table.candidates(hash), s.version));
            let mut position = None;
            for (candidate_position, candidate) in candidates {
                if candidate.is_same(key) || rt.equals(&candidate, key)? {
                    position = Some(candidate_position);
                    break;
                }
            }
            if self.0.read(|s| s.version) == version {
                return Ok(Lookup { position, version });
            }
        }
    }

    /// `dict.get(key)`
    pub fn get(&self, rt: &Runtime, key: &Value) -> RunResult<Option<Value>> {
        let hash = rt.hash(key)?;
        loop {
            let found = self.lookup(rt, key, hash)?;
            let value = self.0.read(|s| {
                (s.version == found.version)
                    .then(|| found.position.and_then(|p| s.table.entry(p)).map(|e| e.value.clone()))
            });
            if let Some(value) = value {
                return Ok(value);
            }
        }
    }

    /// `dict[key]`, raising `KeyError` when absent.
    pub fn get_item(&self, rt: &Runtime, key: &Value) -> RunResult<Value> {
        match self.get(rt, key)? {
            Some(value) => Ok(value),
            None => Err(ExcType::key_error(rt.repr(key)?)),
        }
    }

    /// `key in dict`
    pub fn contains(&self, rt: &Runtime, key: &Value) -> RunResult<bool> {
        let hash = rt.hash(key)?;
        Ok(self.lookup(rt, key, hash)?.position.is_some())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Runs `apply` under the lock if the dict is still at `found.version`.
    ///
    /// Returns `None` when the dict moved on and the caller must look up again.
    fn commit<R>(&self, found: Lookup, apply: impl FnOnce(&mut DictState, Option<usize>) -> R) -> Option<R> {
        self.0.write(|s| (s.version == found.version).then(|| apply(s, found.position)))
    }

    /// `dict[key] = value`
    pub fn set(&self, rt: &Runtime, key: Value, value: Value) -> RunResult<()> {
        let hash = rt.hash(&key)?;
        let mut pending = Some((key, value));
        loop {
            let Some((key, _)) = &pending else { return Ok(()) };
            let found = self.lookup(rt, key, hash)?;
            let applied = self.commit(found, |s, position| {
                let Some((key, value)) = pending.take() else { return };
                match position {
                    Some(p) => {
                        if let Some(slot) = s.table_mut().value_mut(p) {
                            *slot = value;
                        }
                    }
                    None => {
                        s.table_mut().insert_new(hash, key, value);
                    }
                }
            });
            if applied.is_some() {
                return Ok(());
            }
        }
    }

    /// Removes `key`, returning its value if it was present.
    fn take(&self, rt: &Runtime, key: &Value) -> RunResult<Option<Value>> {
        let hash = rt.hash(key)?;
        loop {
            let found = self.lookup(rt, key, hash)?;
            let Some(position) = found.position else {
                return Ok(None);
            };
            let removed = self.commit(found, |s, _| s.table_mut().remove(position).map(|e| e.value));
            if let Some(removed) = removed {
                return Ok(removed);
            }
        }
    }

    /// `del dict[key]`
    pub fn delete(&self, rt: &Runtime, key: &Value) -> RunResult<()> {
        match self.take(rt, key)? {
            Some(_) => Ok(()),
            None => Err(ExcType::key_error(rt.repr(key)?)),
        }
    }

    /// `dict.pop(key[, default])`
    pub fn pop(&self, rt: &Runtime, key: &Value, default: Option<Value>) -> RunResult<Value> {
        match (self.take(rt, key)?, default) {
            (Some(value), _) | (None, Some(value)) => Ok(value),
            (None, None) => Err(ExcType::key_error(rt.repr(key)?)),
        }
    }

    /// `dict.setdefault(key, default)`: the existing value, or `default` after inserting it.
    pub fn setdefault(&self, rt: &Runtime, key: Value, default: Value) -> RunResult<Value> {
        let hash = rt.hash(&key)?;
        loop {
            let found = self.lookup(rt, &key, hash)?;
            let result = self.commit(found, |s, position| match position {
                Some(p) => s.table.entry(p).map_or(Value::None, |e| e.value.clone()),
                None => {
                    s.table_mut().insert_new(hash, key.clone(), default.clone());
                    default.clone()
                }
            });
            if let Some(value) = result {
                return Ok(value);
            }
        }
    }

    /// `dict.popitem()`: removes the most recently inserted entry.
    pub fn popitem(&self) -> RunResult<(Value, Value)> {
        self.0
            .write(|s| s.table_mut().pop_last().map(|e| (e.key, e.value)))
            .ok_or_else(ExcType::key_error_popitem_empty_dict)
    }

    /// `dict.update(other)` from a dict or an iterable of pairs.
    ///
    /// The source is read completely before any entry is written, so
    /// `d.update(d)` is a no-op.
    pub fn update(&self, rt: &Runtime, source: &Value) -> RunResult<()> {
        let pairs = match source {
            Value::Dict(other) => other.items_vec(),
            other => pairs_from_iterable(rt, other)?,
        };
        for (key, value) in pairs {
            self.set(rt, key, value)?;
        }
        Ok(())
    }

    pub fn clear(&self) {
        self.0.write(|s| s.table_mut().clear());
    }

    /// Shallow copy.
    #[must_use]
    pub fn copy(&self) -> Self {
        let table = self.0.read(|s| s.table.clone());
        Self(Arc::new(Monitor::new(DictState { table, version: 0 })))
    }

    // ========================================================================
    // Comparison and repr
    // ========================================================================

    /// `self == other`: same length and every key maps to an equal value.
    pub fn equals(&self, rt: &Runtime, other: &Self) -> RunResult<bool> {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ok(true);
        }
        let entries = self.items_vec();
        if entries.len() != other.len() {
            return Ok(false);
        }
        let _depth = DataDepthGuard::enter()?;
        for (key, value) in &entries {
            match other.get(rt, key)? {
                Some(theirs) if rt.equals(value, &theirs)? => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// `repr(dict)`; a dict that contains itself prints as `{...}`.
    pub fn repr(&self, rt: &Runtime) -> RunResult<String> {
        let Some(_guard) = ReprGuard::enter(self.addr())? else {
            return Ok("{...}".to_owned());
        };
        let mut out = String::from("{");
        for (i, (key, value)) in self.items_vec().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&rt.repr(key)?);
            out.push_str(": ");
            out.push_str(&rt.repr(value)?);
        }
        out.push('}');
        Ok(out)
    }

    /// Entry count and table layout, read together for an iterator snapshot.
    fn shape(&self) -> (usize, u64) {
        self.0.read(|s| (s.table.len(), s.table.layout()))
    }

    /// Entry at or after `position`, checked against the iterator's snapshot.
    fn step(&self, position: usize, expected: (usize, u64)) -> RunResult<Option<(usize, Value, Value)>> {
        self.0.read(|s| {
            if s.table.len() != expected.0 {
                return Err(ExcType::runtime_error_dict_changed_size());
            }
            if s.table.layout() != expected.1 {
                return Err(ExcType::runtime_error_dict_keys_changed());
            }
            Ok(s.table
                .next_from(position)
                .map(|(p, e)| (p, e.key.clone(), e.value.clone())))
        })
    }
}

/// Reads an iterable of 2-item iterables into pairs.
fn pairs_from_iterable(rt: &Runtime, source: &Value) -> RunResult<Vec<(Value, Value)>> {
    let mut pairs = Vec::new();
    for (index, element) in rt.iterate(source)?.enumerate() {
        let element = element?;
        let items = rt.iterate(&element).map_err(|_| {
            ExcType::type_error(format!(
                "cannot convert dictionary update sequence element #{index} to a sequence"
            ))
        })?;
        let items = items.collect::<RunResult<Vec<_>>>()?;
        match <[Value; 2]>::try_from(items) {
            Ok([key, value]) => pairs.push((key, value)),
            Err(items) => return Err(ExcType::value_error_dict_update_sequence(index, items.len())),
        }
    }
    Ok(pairs)
}

/// What a [`DictIter`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterKind {
    Keys,
    Values,
    Items,
}

/// Iterator over a dict that faults once the entry count changes.
#[derive(Debug)]
pub struct DictIter {
    dict: Dict,
    kind: IterKind,
    position: usize,
    expected: (usize, u64),
    finished: bool,
}

impl DictIter {
    fn new(dict: Dict, kind: IterKind) -> Self {
        let expected = dict.shape();
        Self {
            dict,
            kind,
            position: 0,
            expected,
            finished: false,
        }
    }

    #[must_use]
    pub fn keys(dict: Dict) -> Self {
        Self::new(dict, IterKind::Keys)
    }

    #[must_use]
    pub fn values(dict: Dict) -> Self {
        Self::new(dict, IterKind::Values)
    }

    #[must_use]
    pub fn items(dict: Dict) -> Self {
        Self::new(dict, IterKind::Items)
    }
}

impl Iterator for DictIter {
    type Item = RunResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.dict.step(self.position, self.expected) {
            Ok(Some((position, key, value))) => {
                self.position = position + 1;
                Some(Ok(match self.kind {
                    IterKind::Keys => key,
                    IterKind::Values => value,
                    IterKind::Items => Value::tuple(vec![key, value]),
                }))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

// ============================================================================
// Dispatch glue
// ============================================================================

fn receiver(args: &[Value]) -> RunResult<(&Dict, ArgValues<'_>)> {
    match ArgValues::split(args)? {
        (Value::Dict(dict), rest) => Ok((dict, rest)),
        (other, _) => Err(RunError::internal(format!("dict slot called on {}", other.py_type()))),
    }
}

/// Built-in slot table for `dict`.
pub(crate) fn slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::GetItem => getitem,
        Operation::SetItem => setitem,
        Operation::DelItem => delitem,
        Operation::Len => len,
        Operation::Contains => contains,
        Operation::Hash => unhashable,
        Operation::Repr => repr,
        Operation::Compare(cmp) => return Some(Builtin::Compare(compare, *cmp)),
        Operation::Binary(BinaryOp::Or) => or,
        Operation::InPlace(BinaryOp::Or) => ior,
        Operation::InvokeMember(name) => method(name)?,
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

fn method(name: &str) -> Option<BuiltinFn> {
    Some(match name {
        "get" => get,
        "keys" => keys,
        "values" => values,
        "items" => items,
        "pop" => pop,
        "popitem" => popitem,
        "setdefault" => setdefault,
        "update" => update,
        "clear" => clear,
        "copy" => copy,
        "fromkeys" => fromkeys,
        "__getitem__" => getitem,
        "__setitem__" => setitem,
        "__delitem__" => delitem,
        "__len__" => len,
        "__contains__" => contains,
        "__repr__" => repr,
        _ => return None,
    })
}

fn getitem(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    dict.get_item(rt, args.get_one_arg("__getitem__")?)
}

fn setitem(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    let (key, value) = args.get_two_args("__setitem__")?;
    dict.set(rt, key.clone(), value.clone())?;
    Ok(Value::None)
}

fn delitem(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    dict.delete(rt, args.get_one_arg("__delitem__")?)?;
    Ok(Value::None)
}

fn len(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(dict.len()))
}

fn contains(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    dict.contains(rt, args.get_one_arg("__contains__")?).map(Value::Bool)
}

fn repr(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, _) = receiver(args)?;
    Ok(Value::str(&dict.repr(rt)?))
}

/// Only `==` and `!=` are defined between dicts.
fn compare(rt: &Runtime, op: CompareOp, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    let name: &'static str = op.into();
    match (op, args.get_one_arg(name)?) {
        (CompareOp::Eq, Value::Dict(other)) => dict.equals(rt, other).map(Value::Bool),
        (CompareOp::Ne, Value::Dict(other)) => dict.equals(rt, other).map(|eq| Value::Bool(!eq)),
        _ => Ok(Value::NotImplemented),
    }
}

/// `d | other`: a merged copy.
fn or(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    let Value::Dict(other) = args.get_one_arg("__or__")? else {
        return Ok(Value::NotImplemented);
    };
    let merged = dict.copy();
    merged.update(rt, &Value::Dict(other.clone()))?;
    Ok(Value::Dict(merged))
}

fn ior(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, rest) = receiver(args)?;
    dict.update(rt, rest.get_one_arg("__ior__")?)?;
    Ok(args[0].clone())
}

fn get(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    let (key, default) = args.get_one_two_args("get")?;
    Ok(dict.get(rt, key)?.unwrap_or_else(|| default.cloned().unwrap_or(Value::None)))
}

fn keys(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("keys")?;
    Ok(Value::DictKeys(dict.keys()))
}

fn values(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("values")?;
    Ok(Value::DictValues(dict.values()))
}

fn items(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("items")?;
    Ok(Value::DictItems(dict.items()))
}

fn pop(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    let (key, default) = args.get_one_two_args("pop")?;
    dict.pop(rt, key, default.cloned())
}

fn popitem(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("popitem")?;
    let (key, value) = dict.popitem()?;
    Ok(Value::tuple(vec![key, value]))
}

fn setdefault(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    let (key, default) = args.get_one_two_args("setdefault")?;
    dict.setdefault(rt, key.clone(), default.cloned().unwrap_or(Value::None))
}

fn update(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    if let Some(source) = args.get_zero_one_arg("update")? {
        dict.update(rt, source)?;
    }
    Ok(Value::None)
}

fn clear(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("clear")?;
    dict.clear();
    Ok(Value::None)
}

fn copy(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (dict, args) = receiver(args)?;
    args.check_zero_args("copy")?;
    Ok(Value::Dict(dict.copy()))
}

/// `d.fromkeys(iterable[, value])`; the receiver only selects the type.
fn fromkeys(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (_, args) = receiver(args)?;
    let (iterable, value) = args.get_one_two_args("fromkeys")?;
    Dict::fromkeys(rt, iterable, value.unwrap_or(&Value::None)).map(Value::Dict)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample(rt: &Runtime) -> Dict {
        Dict::from_pairs(rt, (0..4).map(|i| (Value::Int(i), Value::Int(i * 10)))).unwrap()
    }

    #[test]
    fn numeric_keys_unify() {
        let rt = Runtime::new();
        let dict = sample(&rt);
        assert_eq!(dict.get(&rt, &Value::Float(2.0)).unwrap().and_then(|v| v.as_int()), Some(20));
        dict.set(&rt, Value::Bool(true), Value::Int(-1)).unwrap();
        assert_eq!(dict.len(), 4);
        assert_eq!(dict.get(&rt, &Value::Int(1)).unwrap().and_then(|v| v.as_int()), Some(-1));
    }

    #[test]
    fn iteration_faults_after_size_change() {
        let rt = Runtime::new();
        let dict = sample(&rt);
        let mut it = DictIter::keys(dict.clone());
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(0));
        dict.set(&rt, Value::Int(99), Value::None).unwrap();
        let err = it.next().unwrap().unwrap_err();
        assert_eq!(err.message(), Some("dictionary changed size during iteration"));
        assert!(it.next().is_none());
    }

    /// Deleting and re-inserting as many keys compacts the table under the
    /// iterator without changing its size.
    #[test]
    fn iteration_faults_after_compaction() {
        let rt = Runtime::new();
        let dict = Dict::new();
        for k in 0..16 {
            dict.set(&rt, Value::Int(k), Value::None).unwrap();
        }
        let mut it = DictIter::keys(dict.clone());
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(0));
        for k in 0..9 {
            dict.delete(&rt, &Value::Int(k)).unwrap();
        }
        for k in 100..109 {
            dict.set(&rt, Value::Int(k), Value::None).unwrap();
        }
        assert_eq!(dict.len(), 16);
        let err = it.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), crate::exception::ErrorKind::ContainerMutatedDuringIteration);
        assert_eq!(err.message(), Some("dictionary keys changed during iteration"));
        assert!(it.next().is_none());
    }

    #[test]
    fn popitem_is_lifo() {
        let rt = Runtime::new();
        let dict = sample(&rt);
        let (key, _) = dict.popitem().unwrap();
        assert_eq!(key.as_int(), Some(3));
        dict.clear();
        assert!(dict.popitem().unwrap_err().is_exception_type(ExcType::KeyError));
    }

    #[test]
    fn update_rejects_bad_pairs() {
        let rt = Runtime::new();
        let bad = Value::tuple(vec![Value::tuple(vec![Value::Int(1)])]);
        let err = Dict::from_value(&rt, &bad).unwrap_err();
        assert_eq!(
            err.message(),
            Some("dictionary update sequence element #0 has length 1; 2 is required")
        );
    }
}
