/// Tests for `bytes` and `bytearray`: immutability, the shared method set, and
/// bytearray mutation through the runtime's operator entry points.
use pretty_assertions::assert_eq;
use strata::{
    ErrorKind, ExcType, Runtime, Value, hash_bytes,
    dispatch::{BinaryOp, CompareOp},
    types::{ByteArray, Bytes, List, Slice},
};

fn bytes(data: &[u8]) -> Value {
    Value::Bytes(Bytes::from_slice(data))
}

fn bytearray(data: &[u8]) -> Value {
    Value::ByteArray(ByteArray::new(data.to_vec()))
}

/// Contents of a `bytes` or `bytearray` result.
fn data(value: &Value) -> Vec<u8> {
    match value {
        Value::Bytes(b) => b.as_slice().to_vec(),
        Value::ByteArray(b) => b.to_vec(),
        other => panic!("expected a byte string, got {other:?}"),
    }
}

fn call(rt: &Runtime, receiver: &Value, name: &str, args: &[Value]) -> Value {
    rt.call_method(receiver, name, args)
        .unwrap_or_else(|err| panic!("{name} failed: {err}"))
}

// =============================================================================
// Immutable bytes
// =============================================================================

/// Transforms return new instances and never touch the receiver.
#[test]
fn upper_returns_new_bytes() {
    let rt = Runtime::new();
    let b = bytes(&[72, 101, 108, 108, 111]);
    let upper = call(&rt, &b, "upper", &[]);
    assert_eq!(data(&upper), vec![72, 69, 76, 76, 79]);
    assert_eq!(data(&b), vec![72, 101, 108, 108, 111]);
    assert!(!upper.is_same(&b));
}

/// Bytes hash through the CPython-compatible byte hash and equal bytearrays compare equal.
#[test]
fn hash_and_mixed_equality() {
    let rt = Runtime::new();
    let b = bytes(b"spam");
    let ba = bytearray(b"spam");
    assert_eq!(rt.hash(&b).unwrap(), hash_bytes(b"spam"));
    assert!(rt.equals(&b, &ba).unwrap());
    assert!(rt.equals(&ba, &b).unwrap());
    let err = rt.hash(&ba).unwrap_err();
    assert_eq!(err.message(), Some("unhashable type: 'bytearray'"));
}

/// Byte strings order lexicographically, with a proper prefix first.
#[test]
fn lexicographic_order() {
    let rt = Runtime::new();
    assert!(rt.compare_bool(CompareOp::Lt, &bytes(b"ab"), &bytes(b"abc")).unwrap());
    assert!(rt.compare_bool(CompareOp::Gt, &bytes(b"b"), &bytearray(b"abc")).unwrap());
    assert!(rt.compare_bool(CompareOp::Le, &bytearray(b"abc"), &bytearray(b"abc")).unwrap());
}

/// Indexing yields ints, slicing yields the receiver's own type.
#[test]
fn indexing_and_slicing() {
    let rt = Runtime::new();
    let b = bytes(b"hello");
    assert_eq!(rt.get_item(&b, &Value::Int(-1)).unwrap().as_int(), Some(i64::from(b'o')));
    let sliced = rt.get_item(&b, &Value::Slice(Slice::stepped(-2))).unwrap();
    assert_eq!(data(&sliced), b"olh");
    assert!(matches!(sliced, Value::Bytes(_)));
    let err = rt.get_item(&b, &Value::Int(5)).unwrap_err();
    assert_eq!(err.message(), Some("index out of range"));
}

// =============================================================================
// Shared algorithms
// =============================================================================

/// `startswith` accepts a single prefix or a tuple of prefixes.
#[test]
fn startswith_tuple() {
    let rt = Runtime::new();
    let b = bytes(b"filename.tar.gz");
    let suffixes = Value::tuple(vec![bytes(b".zip"), bytes(b".gz")]);
    assert!(matches!(call(&rt, &b, "endswith", &[suffixes]), Value::Bool(true)));
    assert!(matches!(call(&rt, &b, "startswith", &[bytes(b"name"), Value::Int(4)]), Value::Bool(true)));
    let err = rt.call_method(&b, "startswith", &[Value::str("file")]).unwrap_err();
    assert!(err.is_exception_type(ExcType::TypeError));
}

/// `partition` with an empty separator is an InvalidArgument ValueError.
#[test]
fn partition_and_empty_separator() {
    let rt = Runtime::new();
    let b = bytes(b"key=value=x");
    let Value::Tuple(parts) = call(&rt, &b, "partition", &[bytes(b"=")]) else {
        panic!("partition returns a tuple");
    };
    assert_eq!(parts.iter().map(data).collect::<Vec<_>>(), vec![b"key".to_vec(), b"=".to_vec(), b"value=x".to_vec()]);
    let Value::Tuple(parts) = call(&rt, &b, "rpartition", &[bytes(b"#")]) else {
        panic!("rpartition returns a tuple");
    };
    assert_eq!(data(&parts[2]), b"key=value=x");

    let err = rt.call_method(&b, "partition", &[bytes(b"")]).unwrap_err();
    assert_eq!(err.message(), Some("empty separator"));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

/// `split`, `join` and `splitlines` produce lists of the receiver's type.
#[test]
fn split_and_join() {
    let rt = Runtime::new();
    let parts = call(&rt, &bytes(b" a  b c "), "split", &[]);
    assert_eq!(rt.repr(&parts).unwrap(), "[b'a', b'b', b'c']");
    let joined = call(&rt, &bytes(b"-"), "join", &[parts]);
    assert_eq!(data(&joined), b"a-b-c");

    let lines = call(&rt, &bytearray(b"x\ny\r\n"), "splitlines", &[Value::Bool(true)]);
    assert_eq!(rt.repr(&lines).unwrap(), "[bytearray(b'x\\n'), bytearray(b'y\\r\\n')]");

    let bad = Value::List(List::from_vec(vec![bytes(b"a"), Value::Int(1)]));
    let err = rt.call_method(&bytes(b","), "join", &[bad]).unwrap_err();
    assert_eq!(
        err.message(),
        Some("sequence item 1: expected a bytes-like object, int found")
    );
}

/// Justification needs a single fill byte; a negative width leaves the data alone.
#[test]
fn justification() {
    let rt = Runtime::new();
    let b = bytes(b"ab");
    assert_eq!(data(&call(&rt, &b, "center", &[Value::Int(6), bytes(b"*")])), b"**ab**");
    assert_eq!(data(&call(&rt, &b, "rjust", &[Value::Int(-3)])), b"ab");
    assert_eq!(data(&call(&rt, &bytes(b"-7"), "zfill", &[Value::Int(4)])), b"-007");
    let err = rt.call_method(&b, "ljust", &[Value::Int(5), bytes(b"**")]).unwrap_err();
    assert!(err.is_exception_type(ExcType::TypeError));
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

/// `translate` with a `maketrans` table, plus deletion.
#[test]
fn translate_with_table() {
    let rt = Runtime::new();
    let table = call(&rt, &bytes(b""), "maketrans", &[bytes(b"abc"), bytes(b"xyz")]);
    assert_eq!(data(&table).len(), 256);
    let out = call(&rt, &bytes(b"aabbcc!"), "translate", &[table, bytes(b"!")]);
    assert_eq!(data(&out), b"xxyyzz");
    let err = rt.call_method(&bytes(b"a"), "translate", &[bytes(b"short")]).unwrap_err();
    assert_eq!(err.message(), Some("translation table must be 256 characters long"));
}

/// `hex`/`fromhex` and the codecs.
#[test]
fn hex_and_codecs() {
    let rt = Runtime::new();
    let b = bytes(b"\x01\xab");
    assert_eq!(call(&rt, &b, "hex", &[]).as_str(), Some("01ab"));
    assert_eq!(data(&call(&rt, &b, "fromhex", &[Value::str("ff 00")])), b"\xff\x00");
    assert_eq!(call(&rt, &bytes(b"caf\xc3\xa9"), "decode", &[]).as_str(), Some("café"));

    let err = rt.call_method(&bytes(b"\x80"), "decode", &[Value::str("ascii")]).unwrap_err();
    assert_eq!(
        err.message(),
        Some("'ascii' codec can't decode byte 0x80 in position 0: ordinal not in range(128)")
    );
    assert_eq!(Bytes::from_encoded_text("é", "latin-1").unwrap().as_slice(), b"\xe9");
}

/// `index`/`rindex` fail with ValueError where `find`/`rfind` return -1.
#[test]
fn search_methods() {
    let rt = Runtime::new();
    let b = bytes(b"abcabc");
    assert_eq!(call(&rt, &b, "rfind", &[bytes(b"bc")]).as_int(), Some(4));
    assert_eq!(call(&rt, &b, "find", &[Value::Int(i64::from(b'z'))]).as_int(), Some(-1));
    assert_eq!(call(&rt, &b, "count", &[bytes(b"abc")]).as_int(), Some(2));
    let err = rt.call_method(&b, "index", &[bytes(b"x")]).unwrap_err();
    assert_eq!(err.message(), Some("subsection not found"));
    assert!(rt.contains(&b, &Value::Int(i64::from(b'c'))).unwrap());
    assert!(rt.contains(&b, &bytes(b"ca")).unwrap());
}

/// The empty needle matches at the end of the data but not past it.
#[test]
fn empty_needle_past_the_end() {
    let rt = Runtime::new();
    for b in [bytes(b"abc"), bytearray(b"abc")] {
        assert_eq!(call(&rt, &b, "find", &[bytes(b""), Value::Int(3)]).as_int(), Some(3));
        assert_eq!(call(&rt, &b, "find", &[bytes(b""), Value::Int(4)]).as_int(), Some(-1));
        assert_eq!(call(&rt, &b, "rfind", &[bytes(b""), Value::Int(4)]).as_int(), Some(-1));
        assert_eq!(call(&rt, &b, "count", &[bytes(b""), Value::Int(3)]).as_int(), Some(1));
        assert_eq!(call(&rt, &b, "count", &[bytes(b""), Value::Int(4)]).as_int(), Some(0));
        assert!(matches!(call(&rt, &b, "startswith", &[bytes(b""), Value::Int(3)]), Value::Bool(true)));
        assert!(matches!(call(&rt, &b, "startswith", &[bytes(b""), Value::Int(4)]), Value::Bool(false)));
        assert!(matches!(call(&rt, &b, "endswith", &[bytes(b""), Value::Int(4)]), Value::Bool(false)));
        assert!(rt.call_method(&b, "index", &[bytes(b""), Value::Int(4)]).is_err());
    }
}

// =============================================================================
// Bytearray mutation
// =============================================================================

/// `+=` accepts bytes, bytearrays and iterables of ints, and mutates in place.
#[test]
fn inplace_add_sources() {
    let rt = Runtime::new();
    let ba = bytearray(b"ab");
    let same = rt.inplace_op(BinaryOp::Add, &ba, &bytes(b"c")).unwrap();
    assert!(same.is_same(&ba));
    rt.inplace_op(BinaryOp::Add, &ba, &Value::List(List::from_vec(vec![Value::Int(100)])))
        .unwrap();
    rt.inplace_op(BinaryOp::Add, &ba, &ba.clone()).unwrap();
    assert_eq!(data(&ba), b"abcdabcd");

    let err = rt
        .inplace_op(BinaryOp::Add, &ba, &Value::List(List::from_vec(vec![Value::Int(256)])))
        .unwrap_err();
    assert_eq!(err.message(), Some("byte must be in range(0, 256)"));
}

/// `*=` repeats in place; a count of zero clears.
#[test]
fn inplace_repeat() {
    let rt = Runtime::new();
    let ba = bytearray(b"xy");
    rt.inplace_op(BinaryOp::Mul, &ba, &Value::Int(3)).unwrap();
    assert_eq!(data(&ba), b"xyxyxy");
    rt.inplace_op(BinaryOp::Mul, &ba, &Value::Int(0)).unwrap();
    assert_eq!(rt.len(&ba).unwrap(), 0);
}

/// Index and slice assignment and deletion.
#[test]
fn item_assignment() {
    let rt = Runtime::new();
    let ba = bytearray(b"abcdef");
    rt.set_item(&ba, &Value::Int(0), &Value::Int(i64::from(b'A'))).unwrap();
    rt.set_item(&ba, &Value::Slice(Slice::range(1, 3)), &bytes(b"-")).unwrap();
    assert_eq!(data(&ba), b"A-def");
    rt.del_item(&ba, &Value::Slice(Slice::stepped(-2))).unwrap();
    assert_eq!(data(&ba), b"-e");
    let err = rt.set_item(&ba, &Value::Int(9), &Value::Int(0)).unwrap_err();
    assert_eq!(err.message(), Some("bytearray index out of range"));
}

/// Methods that exist only on the mutable variant.
#[test]
fn mutating_methods() {
    let rt = Runtime::new();
    let ba = bytearray(b"bc");
    call(&rt, &ba, "insert", &[Value::Int(0), Value::Int(i64::from(b'a'))]);
    call(&rt, &ba, "append", &[Value::Int(i64::from(b'd'))]);
    call(&rt, &ba, "reverse", &[]);
    assert_eq!(data(&ba), b"dcba");
    assert_eq!(call(&rt, &ba, "pop", &[]).as_int(), Some(i64::from(b'a')));
    let copy = call(&rt, &ba, "copy", &[]);
    call(&rt, &ba, "clear", &[]);
    assert_eq!(data(&copy), b"dcb");
    assert!(rt.call_method(&bytes(b"x"), "append", &[Value::Int(1)]).is_err());
}

/// Shared transforms on a bytearray return bytearrays.
#[test]
fn bytearray_transforms_keep_type() {
    let rt = Runtime::new();
    let ba = bytearray(b"hello world");
    let title = call(&rt, &ba, "title", &[]);
    assert!(matches!(title, Value::ByteArray(_)));
    assert_eq!(rt.repr(&title).unwrap(), "bytearray(b'Hello World')");
    assert_eq!(data(&ba), b"hello world");
}
