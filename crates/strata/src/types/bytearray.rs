//! The `bytearray` type: the mutable, lockable byte buffer.
//!
//! Read-only methods run the shared algorithms in [`super::bytes`] over the
//! span read under the lock; they never see a half-applied mutation.
//! Mutations take the lock only for the buffer change itself.

use std::{cmp::Ordering, sync::Arc};

use crate::{
    args::{ArgValues, optional_index},
    dispatch::{BinaryOp, Builtin, BuiltinFn, Operation, builtins::unhashable},
    exception::{ExcType, RunError, RunResult},
    runtime::Runtime,
    sync::{Monitor, ObjectId, OrderedLocker},
    types::{
        Type,
        bytes::{ByteSequence, byte_value, bytes_from_source, bytes_like, encode, shared_slot},
        growable::GrowableArray,
        slice::{Slice, clamp_insert_index, normalize_index},
    },
    value::Value,
};

/// Python `bytearray`.
///
/// Cloning the handle shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct ByteArray(Arc<Monitor<GrowableArray<u8>>>);

impl ByteArray {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self::from_array(GrowableArray::from_vec(data))
    }

    fn from_array(data: GrowableArray<u8>) -> Self {
        Self(Arc::new(Monitor::new(data)))
    }

    /// `bytearray(source)`: an int count of zero bytes, a bytes-like object, or an iterable of ints.
    pub fn from_iterable(rt: &Runtime, source: &Value) -> RunResult<Self> {
        Ok(Self::new(bytes_from_source(rt, source)?))
    }

    /// `bytearray(text, encoding)`
    pub fn from_encoded_text(text: &str, encoding: &str) -> RunResult<Self> {
        Ok(Self::new(encode(text, encoding)?))
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
        self.0.read(GrowableArray::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the current contents out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.read(|b| b.as_slice().to_vec())
    }

    /// Runs `f` over the contents with the lock held.
    pub fn with_slice<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.0.read(|b| f(b.as_slice()))
    }

    /// Lexicographic order of two buffers, read under ordered locks.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        let pair = OrderedLocker::new(&*self.0, &*other.0);
        let ordering = pair.left().as_slice().cmp(pair.right().as_slice());
        pair.release();
        ordering
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    /// `b[index]`
    pub fn get(&self, index: i64) -> RunResult<u8> {
        self.0.read(|b| {
            normalize_index(index, b.len())
                .and_then(|i| b.get(i).copied())
                .ok_or_else(ExcType::bytearray_index_error)
        })
    }

    /// `b[index] = byte`
    pub fn set(&self, index: i64, byte: u8) -> RunResult<()> {
        self.0.write(|b| {
            let i = normalize_index(index, b.len()).ok_or_else(ExcType::bytearray_index_error)?;
            b.set(i, byte);
            Ok(())
        })
    }

    /// `del b[index]`
    pub fn delete(&self, index: i64) -> RunResult<()> {
        self.0.write(|b| {
            let i = normalize_index(index, b.len()).ok_or_else(ExcType::bytearray_index_error)?;
            b.remove_at(i);
            Ok(())
        })
    }

    /// `b[slice]`, always a fresh bytearray.
    pub fn get_slice(&self, slice: &Slice) -> RunResult<Self> {
        self.0.read(|b| {
            let indices = slice.indices(b.len())?;
            Ok(Self::from_array(b.copy_slice(&indices)))
        })
    }

    /// `b[slice] = source`; the source is read before the lock is taken.
    pub fn set_slice(&self, rt: &Runtime, slice: &Slice, source: &Value) -> RunResult<()> {
        let data = match source {
            Value::Int(_) | Value::Bool(_) => {
                return Err(ExcType::type_error("can assign only bytes, buffers, or iterables of ints in range(0, 256)"));
            }
            other => bytes_from_source(rt, other)?,
        };
        self.0.write(|b| {
            let indices = slice.indices(b.len())?;
            b.assign_slice(&indices, data)
        })
    }

    /// `del b[slice]`
    pub fn delete_slice(&self, slice: &Slice) -> RunResult<()> {
        self.0.write(|b| {
            let indices = slice.indices(b.len())?;
            b.delete_slice(&indices);
            Ok(())
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn append(&self, byte: u8) {
        self.0.write(|b| b.append(byte));
    }

    /// Appends raw bytes.
    pub fn extend_from_slice(&self, data: &[u8]) {
        self.0.write(|b| b.extend(data.iter().copied()));
    }

    /// `b.extend(source)` and `b += source`.
    ///
    /// The operand is snapshotted under its own lock first, then only the
    /// receiver is locked, so `b += b` doubles `b`.
    pub fn extend(&self, rt: &Runtime, source: &Value) -> RunResult<()> {
        let data = match source {
            Value::Str(_) => return Err(ExcType::type_error("expected iterable of integers; got: 'str'")),
            Value::Int(_) | Value::Bool(_) => {
                return Err(ExcType::type_error(format!("can't extend bytearray with {}", source.py_type())));
            }
            other => bytes_from_source(rt, other)?,
        };
        self.extend_from_slice(&data);
        Ok(())
    }

    /// Inserts before `index`, clamping out-of-range positions to either end.
    pub fn insert(&self, index: i64, byte: u8) {
        self.0.write(|b| {
            let at = clamp_insert_index(index, b.len());
            b.insert(at, byte);
        });
    }

    /// `b.pop([index])`
    pub fn pop(&self, index: Option<i64>) -> RunResult<u8> {
        self.0.write(|b| {
            let len = b.len();
            if len == 0 {
                return Err(ExcType::index_error_pop_empty_bytearray());
            }
            let i = normalize_index(index.unwrap_or(-1), len).ok_or_else(ExcType::index_error_pop_out_of_range)?;
            b.pop_at(i).ok_or_else(ExcType::index_error_pop_out_of_range)
        })
    }

    /// Removes the first occurrence of `byte`.
    pub fn remove(&self, byte: u8) -> RunResult<()> {
        self.0.write(|b| {
            let position = b.iter().position(|&x| x == byte).ok_or_else(ExcType::value_error_not_in_bytearray)?;
            b.remove_at(position);
            Ok(())
        })
    }

    pub fn reverse(&self) {
        self.0.write(GrowableArray::reverse);
    }

    pub fn clear(&self) {
        self.0.write(GrowableArray::clear);
    }

    #[must_use]
    pub fn copy(&self) -> Self {
        Self::new(self.to_vec())
    }

    /// `self * count`
    pub fn repeat(&self, count: i64) -> RunResult<Self> {
        self.0.read(|b| b.repeated(count)).map(Self::from_array)
    }

    /// `b *= count`; a count of zero or less clears.
    pub fn repeat_in_place(&self, count: i64) -> RunResult<()> {
        self.0.write(|b| b.repeat_in_place(count))
    }

    /// `self + other`, reading both under ordered locks.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let pair = OrderedLocker::new(&*self.0, &*other.0);
        let joined = GrowableArray::concat(pair.left().as_slice(), pair.right().as_slice());
        pair.release();
        Self::from_array(joined)
    }
}

/// Iterator over a bytearray that re-reads the bounds on every step.
#[derive(Debug)]
pub struct ByteArrayIter {
    data: ByteArray,
    cursor: usize,
}

impl ByteArrayIter {
    #[must_use]
    pub fn new(data: ByteArray) -> Self {
        Self { data, cursor: 0 }
    }
}

impl Iterator for ByteArrayIter {
    type Item = RunResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let byte = self.data.0.read(|b| b.get(self.cursor).copied())?;
        self.cursor += 1;
        Some(Ok(Value::Int(i64::from(byte))))
    }
}

impl ByteSequence for ByteArray {
    const TYPE: Type = Type::Bytearray;

    fn borrow_value(value: &Value) -> Option<&Self> {
        match value {
            Value::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.with_slice(f)
    }

    fn wrap(data: Vec<u8>) -> Value {
        Value::ByteArray(Self::new(data))
    }

    fn index_error() -> RunError {
        ExcType::bytearray_index_error()
    }
}

// ============================================================================
// Dispatch glue
// ============================================================================

fn receiver(args: &[Value]) -> RunResult<(&ByteArray, ArgValues<'_>)> {
    match ArgValues::split(args)? {
        (Value::ByteArray(b), rest) => Ok((b, rest)),
        (other, _) => Err(RunError::internal(format!("bytearray slot called on {}", other.py_type()))),
    }
}

/// Built-in slot table for `bytearray`.
pub(crate) fn slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::SetItem => setitem,
        Operation::DelItem => delitem,
        Operation::Hash => unhashable,
        Operation::Binary(BinaryOp::Mul) | Operation::ReflectedBinary(BinaryOp::Mul) => mul,
        Operation::Binary(BinaryOp::Add) => add,
        Operation::InPlace(BinaryOp::Add) => iadd,
        Operation::InPlace(BinaryOp::Mul) => imul,
        Operation::InvokeMember(name) => match method(name) {
            Some(func) => func,
            None => return shared_slot::<ByteArray>(op).map(Builtin::Fn),
        },
        other => return shared_slot::<ByteArray>(other).map(Builtin::Fn),
    };
    Some(Builtin::Fn(func))
}

fn method(name: &str) -> Option<BuiltinFn> {
    Some(match name {
        "append" => append,
        "extend" => extend,
        "insert" => insert,
        "pop" => pop,
        "remove" => remove,
        "reverse" => reverse,
        "clear" => clear,
        "copy" => copy,
        "__setitem__" => setitem,
        "__delitem__" => delitem,
        _ => return None,
    })
}

fn setitem(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    let (key, value) = args.get_two_args("__setitem__")?;
    match key {
        Value::Slice(slice) => b.set_slice(rt, slice, value)?,
        Value::Int(_) | Value::Bool(_) => b.set(key.as_index()?, byte_value(value)?)?,
        other => return Err(ExcType::type_error_indices(Type::Bytearray, other.py_type())),
    }
    Ok(Value::None)
}

fn delitem(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    match args.get_one_arg("__delitem__")? {
        Value::Slice(slice) => b.delete_slice(slice)?,
        key @ (Value::Int(_) | Value::Bool(_)) => b.delete(key.as_index()?)?,
        other => return Err(ExcType::type_error_indices(Type::Bytearray, other.py_type())),
    }
    Ok(Value::None)
}

/// `bytearray + bytes-like` stays a bytearray.
fn add(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    match args.get_one_arg("__add__")? {
        Value::ByteArray(other) => Ok(Value::ByteArray(b.concat(other))),
        other => match bytes_like(other) {
            Some(data) => {
                let mut joined = b.to_vec();
                joined.extend_from_slice(&data);
                Ok(Value::ByteArray(ByteArray::new(joined)))
            }
            None => Ok(Value::NotImplemented),
        },
    }
}

fn mul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    match args.get_one_arg("__mul__")?.as_int() {
        Some(count) => b.repeat(count).map(Value::ByteArray),
        None => Ok(Value::NotImplemented),
    }
}

fn iadd(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, rest) = receiver(args)?;
    b.extend(rt, rest.get_one_arg("__iadd__")?)?;
    Ok(args[0].clone())
}

fn imul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, rest) = receiver(args)?;
    match rest.get_one_arg("__imul__")?.as_int() {
        Some(count) => {
            b.repeat_in_place(count)?;
            Ok(args[0].clone())
        }
        None => Ok(Value::NotImplemented),
    }
}

fn append(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    b.append(byte_value(args.get_one_arg("append")?)?);
    Ok(Value::None)
}

fn extend(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    b.extend(rt, args.get_one_arg("extend")?)?;
    Ok(Value::None)
}

fn insert(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    let (index, value) = args.get_two_args("insert")?;
    b.insert(index.as_index()?, byte_value(value)?);
    Ok(Value::None)
}

fn pop(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    let index = optional_index(args.get_zero_one_arg("pop")?)?;
    b.pop(index).map(|byte| Value::Int(i64::from(byte)))
}

fn remove(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    b.remove(byte_value(args.get_one_arg("remove")?)?)?;
    Ok(Value::None)
}

fn reverse(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    args.check_zero_args("reverse")?;
    b.reverse();
    Ok(Value::None)
}

fn clear(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    args.check_zero_args("clear")?;
    b.clear();
    Ok(Value::None)
}

fn copy(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (b, args) = receiver(args)?;
    args.check_zero_args("copy")?;
    Ok(Value::ByteArray(b.copy()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pop_and_remove_errors() {
        let b = ByteArray::new(vec![1, 2]);
        assert_eq!(b.pop(None).unwrap(), 2);
        assert!(b.remove(9).unwrap_err().is_exception_type(ExcType::ValueError));
        assert_eq!(b.pop(Some(0)).unwrap(), 1);
        let err = b.pop(None).unwrap_err();
        assert_eq!(err.message(), Some("pop from empty bytearray"));
    }

    #[test]
    fn iterator_stops_after_truncation() {
        let b = ByteArray::new(vec![1, 2, 3]);
        let mut it = ByteArrayIter::new(b.clone());
        assert_eq!(it.next().unwrap().unwrap().as_int(), Some(1));
        b.clear();
        assert!(it.next().is_none());
    }

    #[test]
    fn self_concat_does_not_deadlock() {
        let b = ByteArray::new(b"ab".to_vec());
        assert_eq!(b.concat(&b).to_vec(), b"abab");
        assert_eq!(b.compare(&b), Ordering::Equal);
    }
}
