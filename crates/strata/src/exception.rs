use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::types::Type;

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Python exception types raised by the container and dispatch layer.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// primary exception class - matches any exception in isinstance checks.
    Exception,

    // --- LookupError hierarchy ---
    /// Intermediate class for lookup errors.
    LookupError,
    /// Subclass of LookupError.
    IndexError,
    /// Subclass of LookupError.
    KeyError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    /// Subclass of RuntimeError.
    NotImplementedError,
    /// Subclass of RuntimeError.
    RecursionError,

    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    /// Subclass of ArithmeticError.
    OverflowError,
    /// Subclass of ArithmeticError.
    ZeroDivisionError,

    // --- ValueError hierarchy ---
    ValueError,
    /// Subclass of ValueError raised by the text codecs.
    UnicodeDecodeError,
    /// Subclass of ValueError raised by the text codecs.
    UnicodeEncodeError,

    AttributeError,
    MemoryError,
    StopIteration,
    TypeError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::Exception => true,
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::RuntimeError => matches!(self, Self::RecursionError | Self::NotImplementedError),
            Self::ArithmeticError => matches!(self, Self::OverflowError | Self::ZeroDivisionError),
            Self::ValueError => matches!(self, Self::UnicodeDecodeError | Self::UnicodeEncodeError),
            _ => false,
        }
    }

    /// Creates a TypeError with an arbitrary message.
    #[must_use]
    pub fn type_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, msg).into()
    }

    /// Creates a ValueError with an arbitrary message.
    #[must_use]
    pub(crate) fn value_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::ValueError, msg).into()
    }

    /// Creates a TypeError for unhashable types.
    ///
    /// Matches CPython's format: `TypeError: unhashable type: 'list'`
    #[must_use]
    pub(crate) fn type_error_unhashable(type_name: impl Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("unhashable type: '{type_name}'")).into()
    }

    /// Creates a KeyError carrying the repr of the missing key.
    #[must_use]
    pub(crate) fn key_error(key_repr: impl Display) -> RunError {
        SimpleException::new_msg(Self::KeyError, key_repr).into()
    }

    /// Creates a TypeError for a wrong number of positional arguments.
    ///
    /// Matches CPython's format: `TypeError: append() takes exactly one argument (2 given)`
    #[must_use]
    pub(crate) fn type_error_arg_count(name: &str, expected: usize, actual: usize) -> RunError {
        let msg = if expected == 1 {
            format!("{name}() takes exactly one argument ({actual} given)")
        } else {
            format!("{name} expected {expected} arguments, got {actual}")
        };
        SimpleException::new_msg(Self::TypeError, msg).into()
    }

    /// Creates a TypeError for too few positional arguments.
    #[must_use]
    pub(crate) fn type_error_at_least(name: &str, min: usize, actual: usize) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name} expected at least {min} argument{}, got {actual}", plural(min)),
        )
        .into()
    }

    /// Creates a TypeError for too many positional arguments.
    #[must_use]
    pub(crate) fn type_error_at_most(name: &str, max: usize, actual: usize) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{name} expected at most {max} argument{}, got {actual}", plural(max)),
        )
        .into()
    }

    /// Creates a TypeError for calling a non-callable value.
    #[must_use]
    pub(crate) fn type_error_not_callable(type_name: impl Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object is not callable")).into()
    }

    /// Creates a TypeError for iterating a non-iterable value.
    #[must_use]
    pub(crate) fn type_error_not_iterable(type_name: impl Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object is not iterable")).into()
    }

    /// Creates a TypeError for a value that cannot be interpreted as an integer.
    #[must_use]
    pub(crate) fn type_error_not_integer(type_name: impl Display) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("'{type_name}' object cannot be interpreted as an integer"),
        )
        .into()
    }

    /// Creates a TypeError for non-integer sequence indices.
    ///
    /// Matches CPython's format: `TypeError: list indices must be integers or slices, not str`
    #[must_use]
    pub(crate) fn type_error_indices(type_: Type, index_type: impl Display) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{type_} indices must be integers or slices, not {index_type}"),
        )
        .into()
    }

    /// Creates a TypeError for a binary operator with no implementation for the operand types.
    ///
    /// Matches CPython's format: `TypeError: unsupported operand type(s) for +: 'int' and 'str'`
    #[must_use]
    pub(crate) fn binary_type_error(op: &str, lhs_type: impl Display, rhs_type: impl Display) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("unsupported operand type(s) for {op}: '{lhs_type}' and '{rhs_type}'"),
        )
        .into()
    }

    /// Creates a TypeError for a unary operator with no implementation for the operand type.
    #[must_use]
    pub(crate) fn unary_type_error(op: &str, value_type: impl Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("bad operand type for unary {op}: '{value_type}'")).into()
    }

    /// Creates a TypeError for an ordering comparison between unrelated types.
    ///
    /// Matches CPython's format: `TypeError: '<' not supported between instances of 'int' and 'str'`
    #[must_use]
    pub(crate) fn type_error_compare(op: &str, lhs_type: impl Display, rhs_type: impl Display) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("'{op}' not supported between instances of '{lhs_type}' and '{rhs_type}'"),
        )
        .into()
    }

    /// Creates a TypeError for an object that does not support an operation slot.
    #[must_use]
    pub(crate) fn type_error_unsupported(type_name: impl Display, what: &str) -> RunError {
        SimpleException::new_msg(Self::TypeError, format!("'{type_name}' object {what}")).into()
    }

    /// Creates an AttributeError for a missing attribute.
    ///
    /// Resolution failures are reported with the `TypeMismatch` kind.
    #[must_use]
    pub(crate) fn attribute_error(type_name: impl Display, attr: &str) -> RunError {
        SimpleException::with_kind(
            Self::AttributeError,
            ErrorKind::TypeMismatch,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
        .into()
    }

    /// Creates a ValueError for a zero slice step.
    ///
    /// Matches CPython's format: `ValueError: slice step cannot be zero`
    #[must_use]
    pub(crate) fn value_error_slice_step_zero() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::InvalidArgument, "slice step cannot be zero").into()
    }

    /// Creates a ValueError for an extended slice assignment with a mismatched length.
    ///
    /// Matches CPython's format:
    /// `ValueError: attempt to assign sequence of size 2 to extended slice of size 3`
    #[must_use]
    pub(crate) fn value_error_extended_slice_size(given: usize, expected: usize) -> RunError {
        SimpleException::with_kind(
            Self::ValueError,
            ErrorKind::InvalidArgument,
            format!("attempt to assign sequence of size {given} to extended slice of size {expected}"),
        )
        .into()
    }

    /// Creates an IndexError for list index out of range (getitem).
    ///
    /// Matches CPython's format: `IndexError('list index out of range')`
    #[must_use]
    pub(crate) fn list_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "list index out of range").into()
    }

    /// Creates an IndexError for list assignment index out of range (setitem).
    ///
    /// Matches CPython's format: `IndexError('list assignment index out of range')`
    #[must_use]
    pub(crate) fn list_assignment_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "list assignment index out of range").into()
    }

    /// Creates an IndexError for tuple index out of range.
    #[must_use]
    pub(crate) fn tuple_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "tuple index out of range").into()
    }

    #[must_use]
    pub(crate) fn str_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "string index out of range").into()
    }

    /// Creates an IndexError for bytes index out of range.
    ///
    /// Matches CPython's format: `IndexError('index out of range')`
    #[must_use]
    pub(crate) fn bytes_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "index out of range").into()
    }

    /// Creates an IndexError for bytearray index out of range.
    #[must_use]
    pub(crate) fn bytearray_index_error() -> RunError {
        SimpleException::new_msg(Self::IndexError, "bytearray index out of range").into()
    }

    /// Creates an IndexError for popping from an empty list.
    ///
    /// Matches CPython's format: `IndexError: pop from empty list`
    #[must_use]
    pub(crate) fn index_error_pop_empty_list() -> RunError {
        SimpleException::new_msg(Self::IndexError, "pop from empty list").into()
    }

    /// Creates an IndexError for popping from an empty bytearray.
    #[must_use]
    pub(crate) fn index_error_pop_empty_bytearray() -> RunError {
        SimpleException::new_msg(Self::IndexError, "pop from empty bytearray").into()
    }

    /// Creates an IndexError for list.pop(index) with invalid index.
    ///
    /// Matches CPython's format: `IndexError: pop index out of range`
    #[must_use]
    pub(crate) fn index_error_pop_out_of_range() -> RunError {
        SimpleException::new_msg(Self::IndexError, "pop index out of range").into()
    }

    /// Creates a ValueError for list.index() when item is not found.
    ///
    /// Matches CPython's format: `ValueError: list.index(x): x not in list`
    #[must_use]
    pub(crate) fn value_error_not_in_list() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::ValueNotFound, "list.index(x): x not in list").into()
    }

    /// Creates a ValueError for list.remove() when item is not found.
    ///
    /// Matches CPython's format: `ValueError: list.remove(x): x not in list`
    #[must_use]
    pub(crate) fn value_error_remove_not_in_list() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::ValueNotFound, "list.remove(x): x not in list").into()
    }

    /// Creates a ValueError for bytearray.remove() when the byte is not found.
    #[must_use]
    pub(crate) fn value_error_not_in_bytearray() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::ValueNotFound, "value not found in bytearray").into()
    }

    /// Creates a ValueError for bytes.index()/bytes.rindex() when the subsequence is not found.
    ///
    /// Matches CPython's format: `ValueError: subsection not found`
    #[must_use]
    pub(crate) fn value_error_subsequence_not_found() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::ValueNotFound, "subsection not found").into()
    }

    /// Creates a ValueError for a byte value outside `range(0, 256)`.
    #[must_use]
    pub(crate) fn value_error_byte_range() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::InvalidArgument, "byte must be in range(0, 256)")
            .into()
    }

    /// Creates a ValueError for partition/split with an empty separator.
    ///
    /// Matches CPython's format: `ValueError: empty separator`
    #[must_use]
    pub(crate) fn value_error_empty_separator() -> RunError {
        SimpleException::with_kind(Self::ValueError, ErrorKind::InvalidArgument, "empty separator").into()
    }

    /// Creates a TypeError for a fill byte argument that is not exactly one byte long.
    ///
    /// Matches CPython's format:
    /// `TypeError: center() argument 2 must be a byte string of length 1, not bytes`
    #[must_use]
    pub(crate) fn type_error_fill_byte(method: &str) -> RunError {
        SimpleException::new_msg(
            Self::TypeError,
            format!("{method}() argument 2 must be a byte string of length 1, not bytes"),
        )
        .into()
    }

    /// Creates the error raised when `translate` receives a table of the wrong size.
    ///
    /// CPython raises ValueError here; the error is classified as a type mismatch
    /// because the argument has the wrong shape.
    #[must_use]
    pub(crate) fn value_error_translate_table() -> RunError {
        SimpleException::with_kind(
            Self::ValueError,
            ErrorKind::TypeMismatch,
            "translation table must be 256 characters long",
        )
        .into()
    }

    /// Creates a ValueError for a list being mutated by a comparison callback during sort.
    ///
    /// Matches CPython's format: `ValueError: list modified during sort`
    #[must_use]
    pub(crate) fn value_error_list_mutated_during_sort() -> RunError {
        SimpleException::with_kind(
            Self::ValueError,
            ErrorKind::ContainerMutatedDuringIteration,
            "list mutated during sort",
        )
        .into()
    }

    /// Creates a ValueError for a list being mutated by a key function during sort.
    #[must_use]
    pub(crate) fn value_error_list_mutated_determining_keys() -> RunError {
        SimpleException::with_kind(
            Self::ValueError,
            ErrorKind::ContainerMutatedDuringIteration,
            "list mutated while determining keys",
        )
        .into()
    }

    /// Creates a RuntimeError for dict mutation during iteration.
    ///
    /// Matches CPython's format: `RuntimeError: dictionary changed size during iteration`
    #[must_use]
    pub(crate) fn runtime_error_dict_changed_size() -> RunError {
        SimpleException::with_kind(
            Self::RuntimeError,
            ErrorKind::ContainerMutatedDuringIteration,
            "dictionary changed size during iteration",
        )
        .into()
    }

    /// Creates a RuntimeError for a dict whose entries moved during iteration
    /// while its size stayed the same.
    ///
    /// Matches CPython's format: `RuntimeError: dictionary keys changed during iteration`
    #[must_use]
    pub(crate) fn runtime_error_dict_keys_changed() -> RunError {
        SimpleException::with_kind(
            Self::RuntimeError,
            ErrorKind::ContainerMutatedDuringIteration,
            "dictionary keys changed during iteration",
        )
        .into()
    }

    /// Creates a KeyError for popping from an empty dict.
    ///
    /// Matches CPython's format: `KeyError: 'popitem(): dictionary is empty'`
    #[must_use]
    pub(crate) fn key_error_popitem_empty_dict() -> RunError {
        SimpleException::new_msg(Self::KeyError, "'popitem(): dictionary is empty'").into()
    }

    /// Creates the ValueError raised when a dict update sequence element is not a pair.
    #[must_use]
    pub(crate) fn value_error_dict_update_sequence(index: usize, len: usize) -> RunError {
        SimpleException::with_kind(
            Self::ValueError,
            ErrorKind::InvalidArgument,
            format!("dictionary update sequence element #{index} has length {len}; 2 is required"),
        )
        .into()
    }

    /// Creates an OverflowError for a repeat count that does not fit in memory.
    #[must_use]
    pub(crate) fn overflow_repeat_count() -> RunError {
        SimpleException::new_msg(Self::OverflowError, "cannot fit 'int' into an index-sized integer").into()
    }

    /// Creates an OverflowError for integer arithmetic outside the 64-bit range.
    #[must_use]
    pub(crate) fn overflow_int() -> RunError {
        SimpleException::new_msg(Self::OverflowError, "integer result out of range").into()
    }

    /// Creates a RecursionError for exceeding the dispatch depth limit.
    #[must_use]
    pub(crate) fn recursion_error() -> RunError {
        SimpleException::new_msg(Self::RecursionError, "maximum recursion depth exceeded").into()
    }

    /// Creates a LookupError for an encoding name this runtime does not know.
    #[must_use]
    pub(crate) fn lookup_error_unknown_encoding(encoding: &str) -> RunError {
        SimpleException::new_msg(Self::LookupError, format!("unknown encoding: {encoding}")).into()
    }

    /// Creates a StopIteration for an exhausted iterator.
    #[must_use]
    pub(crate) fn stop_iteration() -> RunError {
        SimpleException::new(Self::StopIteration, None).into()
    }

    /// Creates a ZeroDivisionError.
    #[must_use]
    pub(crate) fn zero_division(msg: &str) -> RunError {
        SimpleException::new_msg(Self::ZeroDivisionError, msg).into()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Classification of runtime errors, independent of the exception class name.
///
/// Container code picks the class CPython would raise; the kind records which
/// contract was violated so callers can react without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Index or slice addressing outside valid bounds after normalization.
    IndexOutOfRange,
    /// `index()`/`remove()`/`rindex()` target is absent.
    ValueNotFound,
    /// Mapping key is absent.
    KeyMissing,
    /// Wrong argument shape, or no slot for the requested operation.
    TypeMismatch,
    /// Malformed argument violating a domain constraint.
    InvalidArgument,
    /// Structural change detected during enumeration or sorting.
    ContainerMutatedDuringIteration,
    /// The dispatch depth limit was exceeded.
    Recursion,
    Other,
}

impl From<ExcType> for ErrorKind {
    fn from(exc_type: ExcType) -> Self {
        match exc_type {
            ExcType::IndexError => Self::IndexOutOfRange,
            ExcType::KeyError => Self::KeyMissing,
            ExcType::TypeError | ExcType::AttributeError => Self::TypeMismatch,
            ExcType::ValueError
            | ExcType::UnicodeDecodeError
            | ExcType::UnicodeEncodeError
            | ExcType::OverflowError => Self::InvalidArgument,
            ExcType::RecursionError => Self::Recursion,
            _ => Self::Other,
        }
    }
}

/// Simple lightweight representation of an exception.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    kind: ErrorKind,
    arg: Option<String>,
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}: {arg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

impl SimpleException {
    /// Creates a new exception with the given type and optional argument message.
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self {
            exc_type,
            kind: exc_type.into(),
            arg,
        }
    }

    /// Creates a new exception with the given type and argument message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, arg: impl fmt::Display) -> Self {
        Self::new(exc_type, Some(arg.to_string()))
    }

    /// Creates a new exception whose kind differs from the default for its class.
    #[must_use]
    pub fn with_kind(exc_type: ExcType, kind: ErrorKind, arg: impl fmt::Display) -> Self {
        Self {
            exc_type,
            kind,
            arg: Some(arg.to_string()),
        }
    }

    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

/// Runtime error types that can occur while operating on containers or dispatching.
///
/// Two variants:
/// - `Internal`: Bug in this crate, not in user code
/// - `Exc`: Python exception that the surrounding interpreter can catch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunError {
    /// Internal error - indicates a broken invariant inside strata.
    Internal(Cow<'static, str>),
    /// Catchable Python exception (e.g., ValueError, TypeError).
    Exc(Box<SimpleException>),
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error in strata: {msg}"),
            Self::Exc(exc) => exc.fmt(f),
        }
    }
}

impl std::error::Error for RunError {}

impl RunError {
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the exception payload, or `None` for internal errors.
    #[must_use]
    pub fn exception(&self) -> Option<&SimpleException> {
        match self {
            Self::Exc(exc) => Some(exc),
            Self::Internal(_) => None,
        }
    }

    /// Returns the error classification; internal errors report `ErrorKind::Other`.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.exception().map_or(ErrorKind::Other, SimpleException::kind)
    }

    /// Returns true if this error is a catchable exception of `exc_type`.
    #[must_use]
    pub fn is_exception_type(&self, exc_type: ExcType) -> bool {
        self.exception().is_some_and(|exc| exc.exc_type() == exc_type)
    }

    /// Returns the exception message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Exc(exc) => exc.arg(),
            Self::Internal(msg) => Some(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn kind_defaults_follow_class() {
        assert_eq!(ExcType::list_index_error().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(ExcType::value_error_remove_not_in_list().kind(), ErrorKind::ValueNotFound);
        assert_eq!(
            ExcType::runtime_error_dict_changed_size().kind(),
            ErrorKind::ContainerMutatedDuringIteration
        );
        assert_eq!(ExcType::type_error_unhashable("list").kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn display_matches_python_format() {
        let err = ExcType::index_error_pop_empty_list();
        assert_eq!(err.to_string(), "IndexError: pop from empty list");
        assert_eq!("KeyError".parse::<ExcType>(), Ok(ExcType::KeyError));
    }

    #[test]
    fn hierarchy() {
        assert!(ExcType::KeyError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::RecursionError.is_subclass_of(ExcType::RuntimeError));
        assert!(!ExcType::TypeError.is_subclass_of(ExcType::ValueError));
    }
}
