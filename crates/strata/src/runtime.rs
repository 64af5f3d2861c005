//! Operator and protocol entry points.
//!
//! [`Runtime`] owns the dispatch cache and, through it, the object model. Every
//! container operation that may reach user code takes `&Runtime`: hashing,
//! equality and ordering of elements, key functions, and iteration of
//! arbitrary iterables all go through here.
//!
//! Scalars (`bool`, `int`, `float`, `str`, `bytes`) are hashed and compared
//! directly. Everything else is resolved through the dispatch cache, with the
//! usual reflected-operand fallback for comparisons and binary operators.

use std::{fmt::Write, sync::Arc};

use crate::{
    dispatch::{BinaryOp, CacheConfig, CompareOp, DispatchCache, DispatchPolicy, Operation, Thunk, UnaryOp},
    exception::{ExcType, RunResult},
    object_model::{NullModel, ObjectModel, ValueIter},
    py_hash::{TupleHasher, hash_bytes, hash_float, hash_int, hash_str},
    resource::DataDepthGuard,
    types::{ByteArrayIter, DictItems, DictIter, DictKeys, DictValues, ListIter, bytes::bytes_repr},
    value::Value,
};

/// `hash(None)`; constant since CPython 3.12.
const NONE_HASH: u64 = 0xFCA8_6420;

/// `hash(NotImplemented)`, an arbitrary fixed constant.
const NOT_IMPLEMENTED_HASH: u64 = 0x7E57_AB1E;

/// The dispatch layer and its collaborators, shared by every container operation.
#[derive(Debug)]
pub struct Runtime {
    dispatch: DispatchCache,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a runtime for built-in values only.
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(Arc::new(NullModel))
    }

    #[must_use]
    pub fn with_model(model: Arc<dyn ObjectModel>) -> Self {
        Self::with_config(model, CacheConfig::default(), DispatchPolicy::default())
    }

    #[must_use]
    pub fn with_config(model: Arc<dyn ObjectModel>, config: CacheConfig, policy: DispatchPolicy) -> Self {
        Self {
            dispatch: DispatchCache::new(model, config, policy),
        }
    }

    #[must_use]
    pub fn model(&self) -> &dyn ObjectModel {
        self.dispatch.model()
    }

    #[must_use]
    pub fn dispatch(&self) -> &DispatchCache {
        &self.dispatch
    }

    /// Name of the value's type as Python would report it.
    #[must_use]
    pub fn type_name(&self, value: &Value) -> String {
        match value {
            Value::Object(obj) => self.model().class_name(obj.class()),
            other => other.py_type().to_string(),
        }
    }

    /// Resolves `op` for the type of `receiver`.
    #[must_use]
    pub fn resolve(&self, op: &Operation, receiver: &Value) -> Arc<Thunk> {
        self.dispatch.resolve(op, receiver.type_key())
    }

    /// Resolves and runs `op` with `args[0]` as the receiver.
    fn call_slot(&self, op: &Operation, args: &[Value]) -> RunResult<Value> {
        let receiver = args.first().unwrap_or(&Value::None);
        self.resolve(op, receiver).call(self, args)
    }

    /// Invokes any callable value.
    ///
    /// Native functions run directly; everything else goes to the object model.
    pub fn invoke(&self, callable: &Value, args: &[Value]) -> RunResult<Value> {
        match callable {
            Value::Native(func) => func.call(self, args),
            other => self.model().invoke(self, other, args),
        }
    }

    // ========================================================================
    // Hashing and comparison
    // ========================================================================

    /// Python `hash(value)`.
    pub fn hash(&self, value: &Value) -> RunResult<u64> {
        match value {
            Value::None => Ok(NONE_HASH),
            Value::NotImplemented => Ok(NOT_IMPLEMENTED_HASH),
            Value::Bool(b) => Ok(hash_int(i64::from(*b))),
            Value::Int(i) => Ok(hash_int(*i)),
            Value::Float(f) => Ok(hash_float(*f)),
            Value::Str(s) => Ok(hash_str(s)),
            Value::Bytes(b) => Ok(hash_bytes(b.as_slice())),
            Value::Tuple(items) => {
                let _depth = DataDepthGuard::enter()?;
                let mut hasher = TupleHasher::new();
                for item in items.iter() {
                    hasher.push(self.hash(item)?);
                }
                Ok(hasher.finish())
            }
            Value::FrozenSet(set) => Ok(set.hash()),
            other => {
                let thunk = self.resolve(&Operation::Hash, other);
                if thunk.is_missing() {
                    return Ok(identity_hash(other));
                }
                match thunk.call(self, std::slice::from_ref(other))? {
                    Value::Int(i) => Ok(hash_int(i)),
                    Value::Bool(b) => Ok(hash_int(i64::from(b))),
                    _ => Err(ExcType::type_error("__hash__ method should return an integer")),
                }
            }
        }
    }

    /// Python `a == b` as a boolean, with the identity shortcut containers use.
    pub fn equals(&self, a: &Value, b: &Value) -> RunResult<bool> {
        if a.is_same(b) {
            return Ok(true);
        }
        if let Some(eq) = a.intrinsic_eq(b) {
            return Ok(eq);
        }
        self.compare_bool(CompareOp::Eq, a, b)
    }

    /// Python `a < b` as a boolean.
    pub fn less_than(&self, a: &Value, b: &Value) -> RunResult<bool> {
        self.compare_bool(CompareOp::Lt, a, b)
    }

    /// Rich comparison coerced to a boolean.
    pub fn compare_bool(&self, op: CompareOp, a: &Value, b: &Value) -> RunResult<bool> {
        match self.compare(op, a, b)? {
            Value::Bool(result) => Ok(result),
            other => self.truthy(&other),
        }
    }

    /// Rich comparison: forward slot, then reflected slot, then identity for `==`/`!=`.
    pub fn compare(&self, op: CompareOp, a: &Value, b: &Value) -> RunResult<Value> {
        if let Some(ordering) = a.intrinsic_cmp(b) {
            let result = match ordering {
                Some(ordering) => op.matches(ordering),
                None => op == CompareOp::Ne,
            };
            return Ok(Value::Bool(result));
        }

        let forward = self.call_slot(&Operation::Compare(op), &[a.clone(), b.clone()])?;
        if !matches!(forward, Value::NotImplemented) {
            return Ok(forward);
        }
        let reflected = self.call_slot(&Operation::Compare(op.reflected()), &[b.clone(), a.clone()])?;
        if !matches!(reflected, Value::NotImplemented) {
            return Ok(reflected);
        }
        match op {
            CompareOp::Eq => Ok(Value::Bool(a.is_same(b))),
            CompareOp::Ne => Ok(Value::Bool(!a.is_same(b))),
            _ => Err(ExcType::type_error_compare(
                op.symbol(),
                self.type_name(a),
                self.type_name(b),
            )),
        }
    }

    /// Python truthiness.
    pub fn truthy(&self, value: &Value) -> RunResult<bool> {
        Ok(match value {
            Value::None => false,
            Value::NotImplemented | Value::Slice(_) | Value::Native(_) => true,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::ByteArray(b) => !b.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::List(list) => !list.is_empty(),
            Value::Dict(dict)
            | Value::DictKeys(DictKeys(dict))
            | Value::DictValues(DictValues(dict))
            | Value::DictItems(DictItems(dict)) => !dict.is_empty(),
            Value::FrozenSet(set) => !set.is_empty(),
            Value::Object(_) => {
                let thunk = self.resolve(&Operation::Bool, value);
                if !thunk.is_missing() {
                    return match thunk.call(self, std::slice::from_ref(value))? {
                        Value::Bool(b) => Ok(b),
                        other => Err(ExcType::type_error(format!(
                            "__bool__ should return bool, returned {}",
                            self.type_name(&other)
                        ))),
                    };
                }
                let len = self.resolve(&Operation::Len, value);
                if len.is_missing() {
                    true
                } else {
                    self.len(value)? != 0
                }
            }
        })
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Tries the forward slot, then the reflected slot on a differently-typed right operand.
    ///
    /// Returns `None` when both report `NotImplemented`.
    fn binary_dispatch(&self, op: BinaryOp, a: &Value, b: &Value) -> RunResult<Option<Value>> {
        let forward = self.call_slot(&Operation::Binary(op), &[a.clone(), b.clone()])?;
        if !matches!(forward, Value::NotImplemented) {
            return Ok(Some(forward));
        }
        if a.type_key() != b.type_key() {
            let reflected = self.call_slot(&Operation::ReflectedBinary(op), &[b.clone(), a.clone()])?;
            if !matches!(reflected, Value::NotImplemented) {
                return Ok(Some(reflected));
            }
        }
        Ok(None)
    }

    /// `a <op> b`
    pub fn binary_op(&self, op: BinaryOp, a: &Value, b: &Value) -> RunResult<Value> {
        self.binary_dispatch(op, a, b)?
            .ok_or_else(|| ExcType::binary_type_error(op.symbol(), self.type_name(a), self.type_name(b)))
    }

    /// `a <op>= b`: the in-place slot first, then the plain binary operator.
    pub fn inplace_op(&self, op: BinaryOp, a: &Value, b: &Value) -> RunResult<Value> {
        let result = self.call_slot(&Operation::InPlace(op), &[a.clone(), b.clone()])?;
        if !matches!(result, Value::NotImplemented) {
            return Ok(result);
        }
        self.binary_dispatch(op, a, b)?.ok_or_else(|| {
            ExcType::binary_type_error(&op.inplace_symbol(), self.type_name(a), self.type_name(b))
        })
    }

    /// `-a`, `+a`, `~a`
    pub fn unary_op(&self, op: UnaryOp, a: &Value) -> RunResult<Value> {
        match self.call_slot(&Operation::Unary(op), std::slice::from_ref(a))? {
            Value::NotImplemented => Err(ExcType::unary_type_error(op.symbol(), self.type_name(a))),
            result => Ok(result),
        }
    }

    // ========================================================================
    // Container protocol
    // ========================================================================

    /// `container[key]`
    pub fn get_item(&self, container: &Value, key: &Value) -> RunResult<Value> {
        self.call_slot(&Operation::GetItem, &[container.clone(), key.clone()])
    }

    /// `container[key] = value`
    pub fn set_item(&self, container: &Value, key: &Value, value: &Value) -> RunResult<()> {
        self.call_slot(&Operation::SetItem, &[container.clone(), key.clone(), value.clone()])
            .map(drop)
    }

    /// `del container[key]`
    pub fn del_item(&self, container: &Value, key: &Value) -> RunResult<()> {
        self.call_slot(&Operation::DelItem, &[container.clone(), key.clone()])
            .map(drop)
    }

    /// `item in container`, falling back to iteration when there is no `__contains__`.
    pub fn contains(&self, container: &Value, item: &Value) -> RunResult<bool> {
        let thunk = self.resolve(&Operation::Contains, container);
        if thunk.is_missing() {
            for element in self.iterate(container)? {
                if self.equals(&element?, item)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        let result = thunk.call(self, &[container.clone(), item.clone()])?;
        self.truthy(&result)
    }

    /// `len(value)`
    pub fn len(&self, value: &Value) -> RunResult<usize> {
        match self.call_slot(&Operation::Len, std::slice::from_ref(value))? {
            Value::Int(n) => {
                usize::try_from(n).map_err(|_| ExcType::value_error("__len__() should return >= 0"))
            }
            other => Err(ExcType::type_error_not_integer(self.type_name(&other))),
        }
    }

    /// `receiver.name(*args)`
    pub fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> RunResult<Value> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver.clone());
        full.extend_from_slice(args);
        self.call_slot(&Operation::method(name), &full)
    }

    /// `receiver.name`
    pub fn get_member(&self, receiver: &Value, name: &str) -> RunResult<Value> {
        self.call_slot(&Operation::member(name), std::slice::from_ref(receiver))
    }

    /// The enumerator protocol.
    pub fn iterate(&self, value: &Value) -> RunResult<ValueIter> {
        Ok(match value {
            Value::List(list) => Box::new(ListIter::new(list.clone())),
            Value::Tuple(items) => {
                let items = items.clone();
                Box::new((0..items.len()).map(move |i| Ok(items[i].clone())))
            }
            Value::Str(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect();
                Box::new(chars.into_iter().map(Ok))
            }
            Value::Bytes(b) => {
                let b = b.clone();
                Box::new((0..b.len()).map(move |i| Ok(Value::Int(i64::from(b.as_slice()[i])))))
            }
            Value::ByteArray(b) => Box::new(ByteArrayIter::new(b.clone())),
            Value::Dict(dict) | Value::DictKeys(DictKeys(dict)) => Box::new(DictIter::keys(dict.clone())),
            Value::DictValues(DictValues(dict)) => Box::new(DictIter::values(dict.clone())),
            Value::DictItems(DictItems(dict)) => Box::new(DictIter::items(dict.clone())),
            Value::FrozenSet(set) => Box::new(set.to_vec().into_iter().map(Ok)),
            Value::Object(_) => return self.model().get_enumerator(self, value),
            other => return Err(ExcType::type_error_not_iterable(self.type_name(other))),
        })
    }

    /// Drains `value`'s enumerator into a vector.
    pub fn collect(&self, value: &Value) -> RunResult<Vec<Value>> {
        match value {
            Value::List(list) => Ok(list.to_vec()),
            Value::Tuple(items) => Ok(items.to_vec()),
            other => self.iterate(other)?.collect(),
        }
    }

    /// Python `repr(value)`.
    pub fn repr(&self, value: &Value) -> RunResult<String> {
        match value {
            Value::None => Ok("None".to_owned()),
            Value::NotImplemented => Ok("NotImplemented".to_owned()),
            Value::Bool(b) => Ok(if *b { "True" } else { "False" }.to_owned()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(float_repr(*f)),
            Value::Str(s) => Ok(str_repr(s)),
            Value::Bytes(b) => Ok(bytes_repr(b.as_slice())),
            Value::Object(obj) => {
                let thunk = self.resolve(&Operation::Repr, value);
                if thunk.is_missing() {
                    return Ok(format!(
                        "<{} object at {:#x}>",
                        self.model().class_name(obj.class()),
                        identity_hash(value)
                    ));
                }
                self.expect_str(thunk.call(self, std::slice::from_ref(value))?)
            }
            other => {
                let result = self.call_slot(&Operation::Repr, std::slice::from_ref(other))?;
                self.expect_str(result)
            }
        }
    }

    fn expect_str(&self, value: Value) -> RunResult<String> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(ExcType::type_error(format!(
                "__repr__ returned non-string (type {})",
                self.type_name(&other)
            ))),
        }
    }
}

/// Default `object.__hash__`: derived from the object's address.
fn identity_hash(value: &Value) -> u64 {
    value.identity().map_or(0, |addr| (addr >> 4) as u64)
}

/// `repr(float)` for the values Rust formats the same way Python does.
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// `repr(str)`: single quotes unless the text contains only single quotes.
pub(crate) fn str_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::List;

    #[test]
    fn scalar_repr() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(0.25), "0.25");
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("a\nb"), "'a\\nb'");
    }

    #[test]
    fn mixed_type_ordering_is_a_type_error() {
        let rt = Runtime::new();
        let err = rt.less_than(&Value::Int(1), &Value::str("a")).unwrap_err();
        assert_eq!(
            err.message(),
            Some("'<' not supported between instances of 'int' and 'str'")
        );
        assert!(!rt.equals(&Value::Int(1), &Value::str("1")).unwrap());
    }

    #[test]
    fn unhashable_list() {
        let rt = Runtime::new();
        let err = rt.hash(&Value::List(List::default())).unwrap_err();
        assert_eq!(err.message(), Some("unhashable type: 'list'"));
    }
}
