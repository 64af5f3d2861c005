//! The dynamic value representation shared by every container and the dispatch cache.
//!
//! Scalars are stored inline; containers are cheap `Arc` handles, so cloning a
//! `Value` never copies container contents. Every variant is `Send + Sync`,
//! which lets the same list or dict be shared across threads.

use std::{any::Any, cmp::Ordering, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    exception::{ExcType, RunResult},
    runtime::Runtime,
    sync::ObjectId,
    types::{ByteArray, Bytes, Dict, DictItems, DictKeys, DictValues, FrozenSet, List, Slice, Type, TypeKey},
};

/// Identity of a class owned by the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Primary value type representing Python objects at runtime.
#[derive(Clone)]
pub enum Value {
    None,
    /// Returned by comparison and binary slots to request the reflected operation.
    NotImplemented,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Bytes(Bytes),
    ByteArray(ByteArray),
    Tuple(Arc<[Value]>),
    List(List),
    Dict(Dict),
    DictKeys(DictKeys),
    DictValues(DictValues),
    DictItems(DictItems),
    FrozenSet(FrozenSet),
    Slice(Slice),
    Native(NativeFunction),
    /// Instance of a class defined by the object model.
    Object(Object),
}

impl Value {
    /// Built-in type of this value; instances of model classes report `Type::Object`.
    #[must_use]
    pub fn py_type(&self) -> Type {
        match self {
            Self::None => Type::NoneType,
            Self::NotImplemented => Type::NotImplementedType,
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Str(_) => Type::Str,
            Self::Bytes(_) => Type::Bytes,
            Self::ByteArray(_) => Type::Bytearray,
            Self::Tuple(_) => Type::Tuple,
            Self::List(_) => Type::List,
            Self::Dict(_) => Type::Dict,
            Self::DictKeys(_) => Type::DictKeys,
            Self::DictValues(_) => Type::DictValues,
            Self::DictItems(_) => Type::DictItems,
            Self::FrozenSet(_) => Type::Frozenset,
            Self::Slice(_) => Type::Slice,
            Self::Native(_) => Type::BuiltinFunction,
            Self::Object(_) => Type::Object,
        }
    }

    /// Key under which the dispatch cache stores thunks for this value's type.
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        match self {
            Self::Object(obj) => TypeKey::Class(obj.class()),
            other => TypeKey::Builtin(other.py_type()),
        }
    }

    /// Address-like identity for heap-backed values.
    ///
    /// Scalars have no identity and return `None`.
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::Str(s) => Some(Arc::as_ptr(s).cast::<u8>() as usize),
            Self::Bytes(b) => Some(b.as_ptr() as usize),
            Self::ByteArray(b) => Some(b.addr()),
            Self::Tuple(t) => Some(Arc::as_ptr(t).cast::<u8>() as usize),
            Self::List(l) => Some(l.addr()),
            Self::Dict(d) | Self::DictKeys(DictKeys(d)) | Self::DictValues(DictValues(d)) | Self::DictItems(DictItems(d)) => {
                Some(d.addr())
            }
            Self::FrozenSet(s) => Some(s.addr()),
            Self::Native(f) => Some(f.addr()),
            Self::Object(o) => Some(o.addr()),
            _ => None,
        }
    }

    /// Python `is`: same object for heap values, same value for scalars.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::NotImplemented, Self::NotImplemented) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Slice(a), Self::Slice(b)) => a == b,
            (Self::DictKeys(_), Self::DictKeys(_))
            | (Self::DictValues(_), Self::DictValues(_))
            | (Self::DictItems(_), Self::DictItems(_)) => self.identity() == other.identity(),
            _ => {
                std::mem::discriminant(self) == std::mem::discriminant(other)
                    && self.identity().is_some()
                    && self.identity() == other.identity()
            }
        }
    }

    /// Decides `==` without running user code, when that is possible.
    ///
    /// Returns `None` when the answer needs element-wise comparison through the
    /// runtime (containers of the same kind) or involves a model object.
    #[must_use]
    pub fn intrinsic_eq(&self, other: &Self) -> Option<bool> {
        if let Some(ord) = self.intrinsic_cmp(other) {
            return Some(ord == Some(Ordering::Equal));
        }
        match (self, other) {
            (Self::Object(_), _) | (_, Self::Object(_)) => None,
            (Self::Tuple(_), Self::Tuple(_))
            | (Self::List(_), Self::List(_))
            | (Self::Dict(_), Self::Dict(_))
            | (
                Self::DictKeys(_) | Self::DictItems(_) | Self::FrozenSet(_),
                Self::DictKeys(_) | Self::DictItems(_) | Self::FrozenSet(_),
            ) => None,
            (Self::None, Self::None) | (Self::NotImplemented, Self::NotImplemented) => Some(true),
            (Self::Slice(a), Self::Slice(b)) => Some(a == b),
            _ => Some(self.is_same(other)),
        }
    }

    /// Orders numbers, strings and byte strings without running user code.
    ///
    /// The outer `None` means "not intrinsically comparable"; the inner `None`
    /// means the values are unordered (a NaN is involved).
    #[must_use]
    pub fn intrinsic_cmp(&self, other: &Self) -> Option<Option<Ordering>> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(Some(a.as_bytes().cmp(b.as_bytes()))),
            (Self::Bytes(a), Self::Bytes(b)) => Some(Some(a.as_slice().cmp(b.as_slice()))),
            (Self::Bytes(a), Self::ByteArray(b)) => Some(Some(b.with_slice(|b| a.as_slice().cmp(b)))),
            (Self::ByteArray(a), Self::Bytes(b)) => Some(Some(a.with_slice(|a| a.cmp(b.as_slice())))),
            (Self::ByteArray(a), Self::ByteArray(b)) => Some(Some(a.compare(b))),
            _ => {
                let (a, b) = (self.as_number()?, other.as_number()?);
                Some(a.partial_cmp(&b))
            }
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Self::Bool(b) => Some(Number::Int(i64::from(*b))),
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Integer value of `bool`/`int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Interprets the value as a sequence index, as `operator.index` would.
    pub fn as_index(&self) -> RunResult<i64> {
        self.as_int().ok_or_else(|| ExcType::type_error_not_integer(self.py_type()))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Builds a tuple value.
    #[must_use]
    pub fn tuple(items: impl Into<Arc<[Self]>>) -> Self {
        Self::Tuple(items.into())
    }

    /// Builds a `str` value.
    #[must_use]
    pub fn str(text: &str) -> Self {
        Self::Str(Arc::from(text))
    }

    /// Builds an `int` from a length or position.
    #[must_use]
    pub fn from_usize(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Numeric view of `bool`/`int`/`float` for mixed comparisons.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
            (Self::Int(a), Self::Float(b)) => cmp_int_float(a, b),
            (Self::Float(a), Self::Int(b)) => cmp_int_float(b, a).map(Ordering::reverse),
        }
    }
}

/// Exact comparison of an integer with a float, without rounding the integer.
fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= 9_223_372_036_854_775_808.0 {
        return Some(Ordering::Less);
    }
    if float < -9_223_372_036_854_775_808.0 {
        return Some(Ordering::Greater);
    }
    #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
    let truncated = float.trunc() as i64;
    match int.cmp(&truncated) {
        Ordering::Equal => {
            let frac = float - float.trunc();
            Some(if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            })
        }
        other => Some(other),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::NotImplemented => f.write_str("NotImplemented"),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "{b:?}"),
            Self::Tuple(items) => {
                let mut t = f.debug_tuple("");
                for item in items.iter() {
                    t.field(item);
                }
                t.finish()
            }
            Self::Slice(s) => write!(f, "{s}"),
            Self::Native(n) => write!(f, "<built-in function {}>", n.name()),
            Self::Object(o) => write!(f, "<object {} at {}>", o.class().0, o.id()),
            other => {
                let id = other.identity().unwrap_or_default();
                write!(f, "<{} at {id:#x}>", other.py_type())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::str(s)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Self::Dict(dict)
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<ByteArray> for Value {
    fn from(bytes: ByteArray) -> Self {
        Self::ByteArray(bytes)
    }
}

impl From<FrozenSet> for Value {
    fn from(set: FrozenSet) -> Self {
        Self::FrozenSet(set)
    }
}

impl From<NativeFunction> for Value {
    fn from(func: NativeFunction) -> Self {
        Self::Native(func)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Self::Object(obj)
    }
}

/// Signature of host functions callable through the runtime.
pub type NativeFn = dyn Fn(&Runtime, &[Value]) -> RunResult<Value> + Send + Sync;

/// A named host function, usable as a key function, comparator or slot target.
#[derive(Clone)]
pub struct NativeFunction(Arc<NativeInner>);

struct NativeInner {
    name: Arc<str>,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(name: &str, func: impl Fn(&Runtime, &[Value]) -> RunResult<Value> + Send + Sync + 'static) -> Self {
        Self(Arc::new(NativeInner {
            name: Arc::from(name),
            func: Box::new(func),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, rt: &Runtime, args: &[Value]) -> RunResult<Value> {
        (self.0.func)(rt, args)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeFunction").field(&self.name()).finish()
    }
}

/// An instance of a class owned by the object model.
///
/// The payload is opaque to strata; the model downcasts it when it needs state.
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

struct ObjectInner {
    id: ObjectId,
    class: ClassId,
    payload: Box<dyn Any + Send + Sync>,
}

impl Object {
    pub fn new(class: ClassId, payload: impl Any + Send + Sync) -> Self {
        Self(Arc::new(ObjectInner {
            id: ObjectId::next(),
            class,
            payload: Box::new(payload),
        }))
    }

    #[must_use]
    pub fn class(&self) -> ClassId {
        self.0.class
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    #[must_use]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.0.payload.downcast_ref()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id)
            .field("class", &self.0.class)
            .finish_non_exhaustive()
    }
}
