//! Set storage and the `frozenset` snapshots that dict-view algebra produces.
//!
//! A [`SetStorage`] is built privately, then frozen into a [`FrozenSet`] that
//! is never mutated again. Element comparisons may run user `__eq__` code, but
//! nothing user code can reach holds a lock over the storage, so no locking is
//! needed.

use std::sync::Arc;

use crate::{
    args::ArgValues,
    dispatch::{BinaryOp, Builtin, BuiltinFn, CompareOp, Operation},
    exception::{RunError, RunResult},
    py_hash::hash_frozenset,
    resource::ReprGuard,
    runtime::Runtime,
    types::{DictItems, DictKeys, table::ProbeTable},
    value::Value,
};

/// Unique, hashed values in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SetStorage {
    table: ProbeTable<()>,
}

impl SetStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the elements of any iterable.
    pub fn from_iterable(rt: &Runtime, iterable: &Value) -> RunResult<Self> {
        let mut storage = Self::new();
        for item in rt.iterate(iterable)? {
            storage.insert(rt, item?)?;
        }
        Ok(storage)
    }

    pub fn from_values(rt: &Runtime, values: impl IntoIterator<Item = Value>) -> RunResult<Self> {
        let mut storage = Self::new();
        for value in values {
            storage.insert(rt, value)?;
        }
        Ok(storage)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.table.iter().map(|e| &e.key)
    }

    fn position(&self, rt: &Runtime, value: &Value, hash: u64) -> RunResult<Option<usize>> {
        for (position, candidate) in self.table.candidates(hash) {
            if candidate.is_same(value) || rt.equals(&candidate, value)? {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    /// Adds `value`; returns false when an equal element was already present.
    pub fn insert(&mut self, rt: &Runtime, value: Value) -> RunResult<bool> {
        let hash = rt.hash(&value)?;
        self.insert_hashed(rt, hash, value)
    }

    fn insert_hashed(&mut self, rt: &Runtime, hash: u64, value: Value) -> RunResult<bool> {
        if self.position(rt, &value, hash)?.is_some() {
            return Ok(false);
        }
        self.table.insert_new(hash, value, ());
        Ok(true)
    }

    pub fn contains(&self, rt: &Runtime, value: &Value) -> RunResult<bool> {
        let hash = rt.hash(value)?;
        Ok(self.position(rt, value, hash)?.is_some())
    }

    fn contains_hashed(&self, rt: &Runtime, hash: u64, value: &Value) -> RunResult<bool> {
        Ok(self.position(rt, value, hash)?.is_some())
    }

    /// Elements of `self` for which `keep(in_other)` holds, with cached hashes reused.
    fn filtered(&self, rt: &Runtime, other: &Self, keep: bool) -> RunResult<Self> {
        let mut result = Self::new();
        for entry in self.table.iter() {
            if other.contains_hashed(rt, entry.hash, &entry.key)? == keep {
                result.insert_hashed(rt, entry.hash, entry.key.clone())?;
            }
        }
        Ok(result)
    }

    pub fn union(&self, rt: &Runtime, other: &Self) -> RunResult<Self> {
        let mut result = self.clone();
        for entry in other.table.iter() {
            result.insert_hashed(rt, entry.hash, entry.key.clone())?;
        }
        Ok(result)
    }

    pub fn intersection(&self, rt: &Runtime, other: &Self) -> RunResult<Self> {
        if self.len() <= other.len() {
            self.filtered(rt, other, true)
        } else {
            other.filtered(rt, self, true)
        }
    }

    pub fn difference(&self, rt: &Runtime, other: &Self) -> RunResult<Self> {
        self.filtered(rt, other, false)
    }

    pub fn symmetric_difference(&self, rt: &Runtime, other: &Self) -> RunResult<Self> {
        let mut result = self.filtered(rt, other, false)?;
        for entry in other.table.iter() {
            if !self.contains_hashed(rt, entry.hash, &entry.key)? {
                result.insert_hashed(rt, entry.hash, entry.key.clone())?;
            }
        }
        Ok(result)
    }

    pub fn is_subset(&self, rt: &Runtime, other: &Self) -> RunResult<bool> {
        if self.len() > other.len() {
            return Ok(false);
        }
        for entry in self.table.iter() {
            if !other.contains_hashed(rt, entry.hash, &entry.key)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_disjoint(&self, rt: &Runtime, other: &Self) -> RunResult<bool> {
        let (smaller, larger) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        for entry in smaller.table.iter() {
            if larger.contains_hashed(rt, entry.hash, &entry.key)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Rich comparison by subset count: `<=` is subset, `<` is proper subset.
    pub fn compare(&self, rt: &Runtime, op: CompareOp, other: &Self) -> RunResult<bool> {
        Ok(match op {
            CompareOp::Eq => self.len() == other.len() && self.is_subset(rt, other)?,
            CompareOp::Ne => !(self.len() == other.len() && self.is_subset(rt, other)?),
            CompareOp::Le => self.is_subset(rt, other)?,
            CompareOp::Lt => self.len() < other.len() && self.is_subset(rt, other)?,
            CompareOp::Ge => other.is_subset(rt, self)?,
            CompareOp::Gt => self.len() > other.len() && other.is_subset(rt, self)?,
        })
    }

    fn hash(&self) -> u64 {
        hash_frozenset(self.table.iter().map(|e| e.hash).collect::<Vec<_>>().into_iter())
    }
}

/// Python `frozenset`: an immutable, shareable [`SetStorage`].
#[derive(Debug, Clone, Default)]
pub struct FrozenSet(Arc<SetStorage>);

impl From<SetStorage> for FrozenSet {
    fn from(storage: SetStorage) -> Self {
        Self(Arc::new(storage))
    }
}

impl FrozenSet {
    pub fn from_iterable(rt: &Runtime, iterable: &Value) -> RunResult<Self> {
        SetStorage::from_iterable(rt, iterable).map(Self::from)
    }

    pub fn from_values(rt: &Runtime, values: impl IntoIterator<Item = Value>) -> RunResult<Self> {
        SetStorage::from_values(rt, values).map(Self::from)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn storage(&self) -> &SetStorage {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.iter().cloned().collect()
    }

    pub fn contains(&self, rt: &Runtime, value: &Value) -> RunResult<bool> {
        self.0.contains(rt, value)
    }

    /// `hash(frozenset)`, order independent.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.0.hash()
    }

    /// `frozenset({1, 2})`, or `frozenset()` when empty.
    pub fn repr(&self, rt: &Runtime) -> RunResult<String> {
        if self.is_empty() {
            return Ok("frozenset()".to_owned());
        }
        let Some(_guard) = ReprGuard::enter(self.addr())? else {
            return Ok("frozenset(...)".to_owned());
        };
        let mut out = String::from("frozenset({");
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&rt.repr(item)?);
        }
        out.push_str("})");
        Ok(out)
    }
}

/// Snapshot of a set-like operand: a frozenset, a keys view or an items view.
///
/// `None` for anything else, so operators can return `NotImplemented`.
pub(crate) fn set_like(rt: &Runtime, value: &Value) -> RunResult<Option<FrozenSet>> {
    Ok(Some(match value {
        Value::FrozenSet(set) => set.clone(),
        Value::DictKeys(DictKeys(dict)) => FrozenSet::from_values(rt, dict.keys_vec())?,
        Value::DictItems(DictItems(dict)) => FrozenSet::from_values(rt, dict.item_tuples())?,
        _ => return Ok(None),
    }))
}

/// Applies a set operator to two snapshots.
pub(crate) fn set_algebra(rt: &Runtime, op: BinaryOp, left: &SetStorage, right: &SetStorage) -> RunResult<Option<FrozenSet>> {
    let result = match op {
        BinaryOp::Or => left.union(rt, right)?,
        BinaryOp::And => left.intersection(rt, right)?,
        BinaryOp::Xor => left.symmetric_difference(rt, right)?,
        BinaryOp::Sub => left.difference(rt, right)?,
        _ => return Ok(None),
    };
    Ok(Some(result.into()))
}

// ============================================================================
// Dispatch glue
// ============================================================================

fn receiver(args: &[Value]) -> RunResult<(&FrozenSet, ArgValues<'_>)> {
    match ArgValues::split(args)? {
        (Value::FrozenSet(set), rest) => Ok((set, rest)),
        (other, _) => Err(RunError::internal(format!("frozenset slot called on {}", other.py_type()))),
    }
}

/// Built-in slot table for `frozenset`.
pub(crate) fn slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::Len => len,
        Operation::Contains => contains,
        Operation::Hash => hash,
        Operation::Repr => repr,
        Operation::Compare(cmp) => return Some(Builtin::Compare(compare, *cmp)),
        Operation::Binary(BinaryOp::Or) => or,
        Operation::Binary(BinaryOp::And) => and,
        Operation::Binary(BinaryOp::Xor) => xor,
        Operation::Binary(BinaryOp::Sub) => sub,
        Operation::InvokeMember(name) => method(name)?,
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

fn method(name: &str) -> Option<BuiltinFn> {
    Some(match name {
        "union" => union,
        "intersection" => intersection,
        "difference" => difference,
        "symmetric_difference" => symmetric_difference,
        "issubset" => issubset,
        "issuperset" => issuperset,
        "isdisjoint" => isdisjoint,
        "copy" => copy,
        "__len__" => len,
        "__contains__" => contains,
        "__hash__" => hash,
        "__repr__" => repr,
        _ => return None,
    })
}

fn len(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(set.len()))
}

fn contains(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    set.contains(rt, args.get_one_arg("__contains__")?).map(Value::Bool)
}

fn hash(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, _) = receiver(args)?;
    Ok(Value::Int(i64::from_ne_bytes(set.hash().to_ne_bytes())))
}

fn repr(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, _) = receiver(args)?;
    Ok(Value::str(&set.repr(rt)?))
}

fn compare(rt: &Runtime, op: CompareOp, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    let name: &'static str = op.into();
    match set_like(rt, args.get_one_arg(name)?)? {
        Some(other) => set.storage().compare(rt, op, other.storage()).map(Value::Bool),
        None => Ok(Value::NotImplemented),
    }
}

/// Operators take only frozensets; views answer through their reflected slots.
fn operator(rt: &Runtime, args: &[Value], op: BinaryOp) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    let Value::FrozenSet(other) = args.get_one_arg(&op.to_string())? else {
        return Ok(Value::NotImplemented);
    };
    Ok(set_algebra(rt, op, set.storage(), other.storage())?.map_or(Value::NotImplemented, Value::FrozenSet))
}

fn or(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    operator(rt, args, BinaryOp::Or)
}

fn and(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    operator(rt, args, BinaryOp::And)
}

fn xor(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    operator(rt, args, BinaryOp::Xor)
}

fn sub(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    operator(rt, args, BinaryOp::Sub)
}

/// Named set methods accept any iterable.
fn named(rt: &Runtime, args: &[Value], name: &str, op: BinaryOp) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    let other = SetStorage::from_iterable(rt, args.get_one_arg(name)?)?;
    Ok(set_algebra(rt, op, set.storage(), &other)?.map_or(Value::NotImplemented, Value::FrozenSet))
}

fn union(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    named(rt, args, "union", BinaryOp::Or)
}

fn intersection(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    named(rt, args, "intersection", BinaryOp::And)
}

fn difference(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    named(rt, args, "difference", BinaryOp::Sub)
}

fn symmetric_difference(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    named(rt, args, "symmetric_difference", BinaryOp::Xor)
}

fn issubset(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    let other = SetStorage::from_iterable(rt, args.get_one_arg("issubset")?)?;
    set.storage().is_subset(rt, &other).map(Value::Bool)
}

fn issuperset(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    let other = SetStorage::from_iterable(rt, args.get_one_arg("issuperset")?)?;
    other.is_subset(rt, set.storage()).map(Value::Bool)
}

fn isdisjoint(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    let other = SetStorage::from_iterable(rt, args.get_one_arg("isdisjoint")?)?;
    set.storage().is_disjoint(rt, &other).map(Value::Bool)
}

fn copy(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (set, args) = receiver(args)?;
    args.check_zero_args("copy")?;
    Ok(Value::FrozenSet(set.clone()))
}
