//! Slot tables for built-in types.
//!
//! Container types keep their tables next to their implementation; this
//! module routes to them and carries the small tables for scalars, tuples,
//! strings and host functions.

use crate::{
    args::{ArgValues, optional_index},
    dispatch::{BinaryOp, Builtin, BuiltinFn, CompareOp, Operation, UnaryOp},
    exception::{ExcType, RunError, RunResult},
    resource::DataDepthGuard,
    runtime::Runtime,
    types::{
        Bytes, Type, bytearray, bytes, dict, dict_views, list, set,
        slice::{adjust_range, normalize_index},
    },
    value::Value,
};

/// The built-in slot for `op` on `ty`, if the type implements it.
pub(crate) fn slot(ty: Type, op: &Operation) -> Option<Builtin> {
    match ty {
        Type::List => list::slot(op),
        Type::Bytes => bytes::slot(op),
        Type::Bytearray => bytearray::slot(op),
        Type::Dict => dict::slot(op),
        Type::DictKeys | Type::DictItems => dict_views::set_view_slot(op),
        Type::DictValues => dict_views::values_slot(op),
        Type::Frozenset => set::slot(op),
        Type::Bool | Type::Int | Type::Float => number_slot(op),
        Type::Tuple => tuple_slot(op),
        Type::Str => str_slot(op),
        Type::Slice => match op {
            Operation::Repr => Some(Builtin::Fn(display_repr)),
            Operation::Hash => Some(Builtin::Fn(unhashable)),
            _ => None,
        },
        Type::BuiltinFunction => match op {
            Operation::Call => Some(Builtin::Fn(call_native)),
            Operation::Repr => Some(Builtin::Fn(display_repr)),
            _ => None,
        },
        Type::NoneType | Type::NotImplementedType | Type::Object => None,
    }
}

/// `__hash__` for mutable types.
pub(crate) fn unhashable(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let receiver = args.first().unwrap_or(&Value::None);
    Err(ExcType::type_error_unhashable(rt.type_name(receiver)))
}

fn display_repr(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    match args.first() {
        Some(Value::Slice(slice)) => Ok(Value::str(&slice.to_string())),
        Some(Value::Native(func)) => Ok(Value::str(&format!("<built-in function {}>", func.name()))),
        Some(other) => Err(RunError::internal(format!("repr slot called on {}", other.py_type()))),
        None => Err(RunError::internal("repr slot called without a receiver")),
    }
}

fn call_native(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    match ArgValues::split(args)? {
        (Value::Native(func), rest) => func.call(rt, rest.as_slice()),
        (other, _) => Err(ExcType::type_error_not_callable(other.py_type())),
    }
}

// ============================================================================
// Numbers
// ============================================================================

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn num(value: &Value) -> Option<Num> {
    match value {
        Value::Bool(b) => Some(Num::Int(i64::from(*b))),
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

impl Num {
    fn float(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

fn number_slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::Binary(BinaryOp::Add) => add,
        Operation::Binary(BinaryOp::Sub) => sub,
        Operation::Binary(BinaryOp::Mul) => mul,
        Operation::Binary(BinaryOp::TrueDiv) => truediv,
        Operation::Binary(BinaryOp::FloorDiv) => floordiv,
        Operation::Binary(BinaryOp::Mod) => modulo,
        Operation::Binary(BinaryOp::Pow) => pow,
        Operation::Binary(BinaryOp::LShift) => lshift,
        Operation::Binary(BinaryOp::RShift) => rshift,
        Operation::Binary(BinaryOp::And) => bitand,
        Operation::Binary(BinaryOp::Or) => bitor,
        Operation::Binary(BinaryOp::Xor) => bitxor,
        Operation::ReflectedBinary(BinaryOp::Add) => radd,
        Operation::ReflectedBinary(BinaryOp::Sub) => rsub,
        Operation::ReflectedBinary(BinaryOp::Mul) => rmul,
        Operation::ReflectedBinary(BinaryOp::TrueDiv) => rtruediv,
        Operation::ReflectedBinary(BinaryOp::FloorDiv) => rfloordiv,
        Operation::ReflectedBinary(BinaryOp::Mod) => rmodulo,
        Operation::ReflectedBinary(BinaryOp::Pow) => rpow,
        Operation::Unary(UnaryOp::Neg) => neg,
        Operation::Unary(UnaryOp::Pos) => pos,
        Operation::Unary(UnaryOp::Invert) => invert,
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

/// Applies `op` to two numeric operands; `None` when either is not a number.
fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> RunResult<Option<Value>> {
    let (Some(x), Some(y)) = (num(a), num(b)) else {
        return Ok(None);
    };
    let result = match (x, y) {
        (Num::Int(x), Num::Int(y)) => int_arithmetic(op, x, y)?,
        _ => float_arithmetic(op, x.float(), y.float())?,
    };
    Ok(Some(result))
}

fn int_arithmetic(op: BinaryOp, x: i64, y: i64) -> RunResult<Value> {
    let checked = |r: Option<i64>| r.map(Value::Int).ok_or_else(ExcType::overflow_int);
    match op {
        BinaryOp::Add => checked(x.checked_add(y)),
        BinaryOp::Sub => checked(x.checked_sub(y)),
        BinaryOp::Mul => checked(x.checked_mul(y)),
        BinaryOp::TrueDiv => {
            if y == 0 {
                return Err(ExcType::zero_division("division by zero"));
            }
            float_arithmetic(op, Num::Int(x).float(), Num::Int(y).float())
        }
        BinaryOp::FloorDiv => {
            if y == 0 {
                return Err(ExcType::zero_division("integer division or modulo by zero"));
            }
            let q = x.checked_div(y).ok_or_else(ExcType::overflow_int)?;
            Ok(Value::Int(if x % y != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q }))
        }
        BinaryOp::Mod => {
            if y == 0 {
                return Err(ExcType::zero_division("integer modulo by zero"));
            }
            let r = x.checked_rem(y).unwrap_or(0);
            Ok(Value::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
        }
        BinaryOp::Pow => match u32::try_from(y) {
            Ok(exp) => checked(x.checked_pow(exp)),
            Err(_) if y < 0 => float_arithmetic(op, Num::Int(x).float(), Num::Int(y).float()),
            Err(_) => Err(ExcType::overflow_int()),
        },
        BinaryOp::LShift | BinaryOp::RShift => {
            if y < 0 {
                return Err(ExcType::value_error("negative shift count"));
            }
            let shift = u32::try_from(y).unwrap_or(u32::MAX);
            if op == BinaryOp::RShift {
                return Ok(Value::Int(if shift >= 64 { x >> 63 } else { x >> shift }));
            }
            if x == 0 {
                return Ok(Value::Int(0));
            }
            let shifted = x.checked_shl(shift).filter(|v| v >> shift == x);
            checked(shifted)
        }
        BinaryOp::And => Ok(Value::Int(x & y)),
        BinaryOp::Or => Ok(Value::Int(x | y)),
        BinaryOp::Xor => Ok(Value::Int(x ^ y)),
        BinaryOp::MatMul => Ok(Value::NotImplemented),
    }
}

fn float_arithmetic(op: BinaryOp, x: f64, y: f64) -> RunResult<Value> {
    let value = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::TrueDiv => {
            if y == 0.0 {
                return Err(ExcType::zero_division("float division by zero"));
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(ExcType::zero_division("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(ExcType::zero_division("float modulo"));
            }
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) { r + y } else { r }
        }
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(ExcType::zero_division("0.0 cannot be raised to a negative power"));
            }
            x.powf(y)
        }
        _ => return Ok(Value::NotImplemented),
    };
    Ok(Value::Float(value))
}

/// `bool & bool` stays a bool; everything else goes through int arithmetic.
fn bitwise(op: BinaryOp, a: &Value, b: &Value) -> RunResult<Value> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(match op {
            BinaryOp::And => *x & *y,
            BinaryOp::Or => *x | *y,
            _ => *x ^ *y,
        })),
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            Ok(arithmetic(op, a, b)?.unwrap_or(Value::NotImplemented))
        }
        _ => Ok(Value::NotImplemented),
    }
}

/// Operands of a binary slot: `(receiver, other)`.
fn operands<'a>(args: &'a [Value], op: BinaryOp) -> RunResult<(&'a Value, &'a Value)> {
    let (receiver, rest) = ArgValues::split(args)?;
    let name: &'static str = op.into();
    Ok((receiver, rest.get_one_arg(name)?))
}

/// Forward numeric slot: `receiver <op> other`.
fn forward(args: &[Value], op: BinaryOp) -> RunResult<Value> {
    let (a, b) = operands(args, op)?;
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => bitwise(op, a, b),
        BinaryOp::LShift | BinaryOp::RShift if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) => {
            Ok(Value::NotImplemented)
        }
        _ => Ok(arithmetic(op, a, b)?.unwrap_or(Value::NotImplemented)),
    }
}

/// Reflected numeric slot: `other <op> receiver`.
fn reflected(args: &[Value], op: BinaryOp) -> RunResult<Value> {
    let (b, a) = operands(args, op)?;
    Ok(arithmetic(op, a, b)?.unwrap_or(Value::NotImplemented))
}

fn add(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Add)
}

fn sub(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Sub)
}

fn mul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Mul)
}

fn truediv(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::TrueDiv)
}

fn floordiv(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::FloorDiv)
}

fn modulo(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Mod)
}

fn pow(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Pow)
}

fn lshift(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::LShift)
}

fn rshift(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::RShift)
}

fn bitand(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::And)
}

fn bitor(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Or)
}

fn bitxor(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    forward(args, BinaryOp::Xor)
}

fn radd(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::Add)
}

fn rsub(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::Sub)
}

fn rmul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::Mul)
}

fn rtruediv(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::TrueDiv)
}

fn rfloordiv(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::FloorDiv)
}

fn rmodulo(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::Mod)
}

fn rpow(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    reflected(args, BinaryOp::Pow)
}

fn neg(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    match args.first().and_then(num) {
        Some(Num::Int(i)) => i.checked_neg().map(Value::Int).ok_or_else(ExcType::overflow_int),
        Some(Num::Float(f)) => Ok(Value::Float(-f)),
        None => Ok(Value::NotImplemented),
    }
}

fn pos(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    match args.first().and_then(num) {
        Some(Num::Int(i)) => Ok(Value::Int(i)),
        Some(Num::Float(f)) => Ok(Value::Float(f)),
        None => Ok(Value::NotImplemented),
    }
}

fn invert(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    match args.first().and_then(num) {
        Some(Num::Int(i)) => Ok(Value::Int(!i)),
        _ => Ok(Value::NotImplemented),
    }
}

// ============================================================================
// Tuples
// ============================================================================

fn tuple_slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::GetItem => tuple_getitem,
        Operation::Len => tuple_len,
        Operation::Contains => tuple_contains,
        Operation::Repr => tuple_repr,
        Operation::Compare(cmp) => return Some(Builtin::Compare(tuple_compare, *cmp)),
        Operation::Binary(BinaryOp::Add) => tuple_add,
        Operation::Binary(BinaryOp::Mul) | Operation::ReflectedBinary(BinaryOp::Mul) => tuple_mul,
        Operation::InvokeMember(name) => match name.as_ref() {
            "count" => tuple_count,
            "index" => tuple_index,
            "__len__" => tuple_len,
            "__getitem__" => tuple_getitem,
            "__contains__" => tuple_contains,
            _ => return None,
        },
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

fn tuple_receiver(args: &[Value]) -> RunResult<(&[Value], ArgValues<'_>)> {
    match ArgValues::split(args)? {
        (Value::Tuple(items), rest) => Ok((items, rest)),
        (other, _) => Err(RunError::internal(format!("tuple slot called on {}", other.py_type()))),
    }
}

fn tuple_getitem(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    match args.get_one_arg("__getitem__")? {
        Value::Slice(slice) => {
            let picked: Vec<Value> = slice.indices(items.len())?.iter().map(|i| items[i].clone()).collect();
            Ok(Value::tuple(picked))
        }
        key @ (Value::Int(_) | Value::Bool(_)) => normalize_index(key.as_index()?, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(ExcType::tuple_index_error),
        other => Err(ExcType::type_error_indices(Type::Tuple, other.py_type())),
    }
}

fn tuple_len(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(items.len()))
}

fn tuple_contains(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    let needle = args.get_one_arg("__contains__")?;
    for item in items {
        if rt.equals(item, needle)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn tuple_count(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    let needle = args.get_one_arg("count")?;
    let mut count = 0;
    for item in items {
        if rt.equals(item, needle)? {
            count += 1;
        }
    }
    Ok(Value::from_usize(count))
}

fn tuple_index(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    let (needle, start, stop) = args.get_one_to_three_args("index")?;
    let (start, stop) = adjust_range(optional_index(start)?, optional_index(stop)?, items.len());
    for (i, item) in items.iter().enumerate().take(stop).skip(start) {
        if rt.equals(item, needle)? {
            return Ok(Value::from_usize(i));
        }
    }
    Err(ExcType::value_error("tuple.index(x): x not in tuple"))
}

fn tuple_repr(rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, _) = tuple_receiver(args)?;
    let _depth = DataDepthGuard::enter()?;
    let mut out = String::from("(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&rt.repr(item)?);
    }
    if items.len() == 1 {
        out.push(',');
    }
    out.push(')');
    Ok(Value::str(&out))
}

fn tuple_compare(rt: &Runtime, op: CompareOp, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    let name: &'static str = op.into();
    match args.get_one_arg(name)? {
        Value::Tuple(other) => sequence_compare(rt, op, items, other).map(Value::Bool),
        _ => Ok(Value::NotImplemented),
    }
}

/// Lexicographic comparison decided by the first unequal pair.
pub(crate) fn sequence_compare(rt: &Runtime, op: CompareOp, a: &[Value], b: &[Value]) -> RunResult<bool> {
    let _depth = DataDepthGuard::enter()?;
    for (x, y) in a.iter().zip(b) {
        if !rt.equals(x, y)? {
            return match op {
                CompareOp::Eq => Ok(false),
                CompareOp::Ne => Ok(true),
                _ => rt.compare_bool(op, x, y),
            };
        }
    }
    Ok(op.matches(a.len().cmp(&b.len())))
}

fn tuple_add(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    match args.get_one_arg("__add__")? {
        Value::Tuple(other) => Ok(Value::tuple([items, &other[..]].concat())),
        _ => Ok(Value::NotImplemented),
    }
}

fn tuple_mul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (items, args) = tuple_receiver(args)?;
    let Some(count) = args.get_one_arg("__mul__")?.as_int() else {
        return Ok(Value::NotImplemented);
    };
    let count = usize::try_from(count).unwrap_or(0);
    let total = items.len().checked_mul(count).ok_or_else(ExcType::overflow_repeat_count)?;
    let mut out = Vec::with_capacity(total);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    Ok(Value::tuple(out))
}

// ============================================================================
// Strings
// ============================================================================

fn str_slot(op: &Operation) -> Option<Builtin> {
    let func: BuiltinFn = match op {
        Operation::GetItem => str_getitem,
        Operation::Len => str_len,
        Operation::Contains => str_contains,
        Operation::Binary(BinaryOp::Add) => str_add,
        Operation::Binary(BinaryOp::Mul) | Operation::ReflectedBinary(BinaryOp::Mul) => str_mul,
        Operation::InvokeMember(name) => match name.as_ref() {
            "encode" => str_encode,
            "__len__" => str_len,
            "__contains__" => str_contains,
            _ => return None,
        },
        _ => return None,
    };
    Some(Builtin::Fn(func))
}

fn str_receiver(args: &[Value]) -> RunResult<(&str, ArgValues<'_>)> {
    match ArgValues::split(args)? {
        (Value::Str(text), rest) => Ok((text, rest)),
        (other, _) => Err(RunError::internal(format!("str slot called on {}", other.py_type()))),
    }
}

fn str_len(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (text, args) = str_receiver(args)?;
    args.check_zero_args("__len__")?;
    Ok(Value::from_usize(text.chars().count()))
}

fn str_getitem(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (text, args) = str_receiver(args)?;
    let chars: Vec<char> = text.chars().collect();
    match args.get_one_arg("__getitem__")? {
        Value::Slice(slice) => {
            let picked: String = slice.indices(chars.len())?.iter().map(|i| chars[i]).collect();
            Ok(Value::str(&picked))
        }
        key @ (Value::Int(_) | Value::Bool(_)) => normalize_index(key.as_index()?, chars.len())
            .map(|i| Value::str(chars[i].encode_utf8(&mut [0; 4])))
            .ok_or_else(ExcType::str_index_error),
        other => Err(ExcType::type_error(format!(
            "string indices must be integers, not '{}'",
            other.py_type()
        ))),
    }
}

fn str_contains(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (text, args) = str_receiver(args)?;
    match args.get_one_arg("__contains__")? {
        Value::Str(needle) => Ok(Value::Bool(text.contains(&**needle))),
        other => Err(ExcType::type_error(format!(
            "'in <string>' requires string as left operand, not {}",
            other.py_type()
        ))),
    }
}

/// `str.encode([encoding])`, UTF-8 by default.
fn str_encode(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (text, args) = str_receiver(args)?;
    let encoding = match args.get_zero_one_arg("encode")? {
        Some(Value::Str(name)) => name.to_string(),
        Some(other) => {
            return Err(ExcType::type_error(format!(
                "encode() argument 'encoding' must be str, not {}",
                other.py_type()
            )));
        }
        None => "utf-8".to_owned(),
    };
    Ok(Value::Bytes(Bytes::from_encoded_text(text, &encoding)?))
}

fn str_add(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (text, args) = str_receiver(args)?;
    match args.get_one_arg("__add__")? {
        Value::Str(other) => Ok(Value::str(&format!("{text}{other}"))),
        _ => Ok(Value::NotImplemented),
    }
}

fn str_mul(_rt: &Runtime, args: &[Value]) -> RunResult<Value> {
    let (text, args) = str_receiver(args)?;
    let Some(count) = args.get_one_arg("__mul__")?.as_int() else {
        return Ok(Value::NotImplemented);
    };
    let count = usize::try_from(count).unwrap_or(0);
    text.len().checked_mul(count).ok_or_else(ExcType::overflow_repeat_count)?;
    Ok(Value::str(&text.repeat(count)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn binary(op: BinaryOp, a: Value, b: Value) -> RunResult<Value> {
        Runtime::new().binary_op(op, &a, &b)
    }

    #[test]
    fn floor_division_rounds_toward_negative_infinity() {
        assert_eq!(binary(BinaryOp::FloorDiv, Value::Int(-7), Value::Int(2)).unwrap().as_int(), Some(-4));
        assert_eq!(binary(BinaryOp::Mod, Value::Int(-7), Value::Int(2)).unwrap().as_int(), Some(1));
        assert_eq!(binary(BinaryOp::Mod, Value::Int(7), Value::Int(-2)).unwrap().as_int(), Some(-1));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let Value::Float(f) = binary(BinaryOp::Add, Value::Int(1), Value::Float(0.5)).unwrap() else {
            panic!("expected float");
        };
        assert!((f - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn overflow_and_zero_division_raise() {
        let err = binary(BinaryOp::Mul, Value::Int(i64::MAX), Value::Int(2)).unwrap_err();
        assert!(err.is_exception_type(ExcType::OverflowError));
        let err = binary(BinaryOp::TrueDiv, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err.message(), Some("division by zero"));
    }

    #[test]
    fn bool_bitwise_stays_bool() {
        assert!(matches!(
            binary(BinaryOp::And, Value::Bool(true), Value::Bool(false)).unwrap(),
            Value::Bool(false)
        ));
        assert_eq!(binary(BinaryOp::Or, Value::Bool(true), Value::Int(2)).unwrap().as_int(), Some(3));
    }

    #[test]
    fn tuple_repr_and_order() {
        let rt = Runtime::new();
        let single = Value::tuple(vec![Value::Int(1)]);
        assert_eq!(rt.repr(&single).unwrap(), "(1,)");
        let a = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::tuple(vec![Value::Int(1), Value::Int(3)]);
        assert!(rt.less_than(&a, &b).unwrap());
        assert!(rt.less_than(&single, &a).unwrap());
    }

    #[test]
    fn int_times_list_uses_reflected_slot() {
        let rt = Runtime::new();
        let list = Value::List(crate::types::List::from_vec(vec![Value::Int(7)]));
        let repeated = rt.binary_op(BinaryOp::Mul, &Value::Int(3), &list).unwrap();
        assert_eq!(rt.repr(&repeated).unwrap(), "[7, 7, 7]");
    }
}
