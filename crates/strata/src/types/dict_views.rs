//! Live `keys()`, `values()` and `items()` views over a [`Dict`].
//!
//! A view holds the dict itself, not a copy, and re-reads it on every use.
//! Keys and items views are set-like: their operators snapshot both sides
//! into [`SetStorage`] and return a [`FrozenSet`].

use crate::{
    args::ArgValues,
    dispatch::{BinaryOp, Builtin, BuiltinFn, CompareOp, Operation, builtins::unhashable},
    exception::{RunError, RunResult},
    resource::ReprGuard,
    runtime::Runtime,
    types::{
        Dict, FrozenSet, Type,
        set::{SetStorage, set_algebra, set_like},
    },
    value::Value,
};

/// `dict.keys()`
#[derive(Debug, Clone)]
pub struct DictKeys(pub(crate) Dict);

/// `dict.values()`
#[derive(Debug, Clone)]
pub struct DictValues(pub(crate) Dict);

/// `dict.items()`
#[derive(Debug, Clone)]
pub struct DictItems(pub(crate) Dict);

impl DictKeys {
    #[must_use]
    pub fn mapping(&self) -> &Dict {
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

    pub fn contains(&self, rt: &Runtime, key: &Value) -> RunResult<bool> {
        self.0.contains(rt, key)
    }

    fn snapshot(&self, rt: &Runtime) -> RunResult<SetStorage> {
        SetStorage::from_values(rt, self.0.keys_vec())
    }
}

impl DictValues {
    #[must_use]
    pub fn mapping(&self) -> &Dict {
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

    /// Linear scan; values are not indexed.
    pub fn contains(&self, rt: &Runtime, value: &Value) -> RunResult<bool> {
        for candidate in self.0.values_vec() {
            if candidate.is_same(value) || rt.equals(&candidate, value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl DictItems {
    #[must_use]
    pub fn mapping(&self) -> &Dict {
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

    /// `(k, v) in items`: the key is present and its value equals `v`.
    pub fn contains(&self, rt: &Runtime, item: &Value) -> RunResult<bool> {
        let Value::Tuple(pair) = item else {
            return Ok(false);
        };
        let [key, value] = &pair[..] else {
            return Ok(false);
        };
        match self.0.get(rt, key)? {
            Some(current) => Ok(current.is_same(value) || rt.equals(&current, value)?),
            None => Ok(false),
        }
    }

    fn snapshot(&self, rt: &Runtime) -> RunResult<SetStorage> {
        SetStorage::from_values(rt, self.0.item_tuples())
    }
}

/// `dict_keys([...])` and friends, printing `...` for a dict already being printed.
fn view_repr(rt: &Runtime, dict: &Dict, view: Type, items: Vec<Value>) -> RunResult<String> {
    let Some(_guard) = ReprGuard::enter(dict.addr())? else {
        return Ok(format!("{view}(...)"));
    };
    let mut out = format!("{view}([");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&rt.repr(item)?);
    }
    out.push_str("])");
    Ok(out)
}

// ============================================================================
// Dispatch glue
// ============================================================================

/// The dict behind any of the three views.
fn view_dict(value: &Value) -> RunResult<&Dict> {
    match value {
        Value::DictKeys(DictKeys(dict)) | Value::DictValues(DictValues(dict)) | Value::DictItems(DictItems(dict)) => {
            Ok(dict)
        }
        other => Err(RunError::internal(format!("dict view slot called on {}", other.py_type()))),
    }
}

/// Snapshot of a keys or items view receiver.
fn receiver_set(rt: &Runtime, value: &Value) -> RunResult<SetStorage> {
    match value {
        Value::DictKeys(keys) => keys.snapshot(rt),
        Value::DictItems(items) => items.snapshot(rt),
        other => Err(RunError::internal(format!("set-like view slot called on {}", other.py_type()))),
    }
}

/// Built-in slot table for `dict_keys` and `dict_items`.
pub(crate) fn set_view_slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::Len => len,
        Operation::Contains => contains,
        Operation::Hash => unhashable,
        Operation::Repr => repr,
        Operation::Compare(cmp) => return Some(Builtin::Compare(compare, *cmp)),
        Operation::Binary(BinaryOp::Or) => or,
        Operation::Binary(BinaryOp::And) => and,
        Operation::Binary(BinaryOp::Xor) => xor,
        Operation::Binary(BinaryOp::Sub) => sub,
        Operation::ReflectedBinary(BinaryOp::Or) => ror,
        Operation::ReflectedBinary(BinaryOp::And) => rand,
        Operation::ReflectedBinary(BinaryOp::Xor) => rxor,
        Operation::ReflectedBinary(BinaryOp::Sub) => rsub,
        Operation::InvokeMember(name) => match name.as_ref() {
            "isdisjoint" => isdisjoint,
            "__len__" => len,
            "__contains__" => contains,
            "__repr__" => repr,
            _ => return None,
        },
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

/// Built-in slot table for `dict_values`; values compare by identity.
pub(crate) fn values_slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::Len => len,
        Operation::Contains => contains,
        Operation::Repr => repr,
        Operation::InvokeMember(name) => match name.as_ref() {
            "__len__" => len,
            "__contains__" => contains,
            "__repr__" => repr,
            _ => return None,
        },
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

fn len(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (view, args) = ArgValues::split(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(view_dict(view)?.len()))
}

fn contains(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (view, args) = ArgValues::split(args)?;
    let item = args.get_one_arg("__contains__")?;
    let found = match view {
        Value::DictKeys(keys) => keys.contains(rt, item)?,
        Value::DictValues(values) => values.contains(rt, item)?,
        Value::DictItems(items) => items.contains(rt, item)?,
        other => return Err(RunError::internal(format!("dict view slot called on {}", other.py_type()))),
    };
    Ok(Value::Bool(found))
}

fn repr(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (view, _) = ArgValues::split(args)?;
    let dict = view_dict(view)?;
    let items = match view {
        Value::DictKeys(_) => dict.keys_vec(),
        Value::DictValues(_) => dict.values_vec(),
        _ => dict.item_tuples(),
    };
    Ok(Value::str(&view_repr(rt, dict, view.py_type(), items)?))
}

/// Subset-count comparison against another set-like operand.
fn compare(rt: &Runtime, op: CompareOp, args: &[Value]) -> RunResult<Value> {
    let (view, args) = ArgValues::split(args)?;
    let name: &'static str = op.into();
    let Some(other) = set_like(rt, args.get_one_arg(name)?)? else {
        return Ok(Value::NotImplemented);
    };
    let mine = receiver_set(rt, view)?;
    mine.compare(rt, op, other.storage()).map(Value::Bool)
}

/// Views combine with any iterable; `reflected` puts the view on the right.
fn algebra(rt: &Runtime, args: &[Value], op: BinaryOp, reflected: bool) -> RunResult<Value> {
    let (view, args) = ArgValues::split(args)?;
    let operand = args.get_one_arg(&op.to_string())?;
    let other = match set_like(rt, operand)? {
        Some(set) => set,
        None => match rt.iterate(operand) {
            Ok(items) => FrozenSet::from(SetStorage::from_values(rt, items.collect::<RunResult<Vec<_>>>()?)?),
            Err(_) => return Ok(Value::NotImplemented),
        },
    };
    let mine = receiver_set(rt, view)?;
    let result = if reflected {
        set_algebra(rt, op, other.storage(), &mine)?
    } else {
        set_algebra(rt, op, &mine, other.storage())?
    };
    Ok(result.map_or(Value::NotImplemented, Value::FrozenSet))
}

fn or(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::Or, false)
}

fn and(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::And, false)
}

fn xor(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::Xor, false)
}

fn sub(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::Sub, false)
}

fn ror(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::Or, true)
}

fn rand(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::And, true)
}

fn rxor(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::Xor, true)
}

fn rsub(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    algebra(rt, args, BinaryOp::Sub, true)
}

/// `view.isdisjoint(iterable)`
fn isdisjoint(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (view, args) = ArgValues::split(args)?;
    let other = SetStorage::from_iterable(rt, args.get_one_arg("isdisjoint")?)?;
    receiver_set(rt, view)?.is_disjoint(rt, &other).map(Value::Bool)
}
