use crate::{
    exception::{ExcType, RunError, RunResult},
    value::Value,
};

/// Positional arguments of a built-in method call, with the receiver split off.
///
/// Built-in thunks receive `[receiver, args...]`; [`ArgValues::split`]
/// separates the two and the `get_*` helpers check arity with CPython's
/// error messages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArgValues<'a> {
    values: &'a [Value],
}

impl<'a> ArgValues<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    /// Splits `[receiver, args...]` into the receiver and the remaining arguments.
    pub fn split(args: &'a [Value]) -> RunResult<(&'a Value, Self)> {
        match args.split_first() {
            Some((receiver, rest)) => Ok((receiver, Self::new(rest))),
            None => Err(RunError::internal("slot called without a receiver")),
        }
    }

    pub fn as_slice(&self) -> &'a [Value] {
        self.values
    }

    /// Checks that zero arguments were passed.
    pub fn check_zero_args(&self, name: &str) -> RunResult<()> {
        if self.values.is_empty() {
            Ok(())
        } else {
            Err(ExcType::type_error(format!(
                "{name}() takes no arguments ({} given)",
                self.values.len()
            )))
        }
    }

    /// Checks that exactly one positional argument was passed, returning it.
    pub fn get_one_arg(&self, name: &str) -> RunResult<&'a Value> {
        match self.values {
            [a] => Ok(a),
            other => Err(ExcType::type_error_arg_count(name, 1, other.len())),
        }
    }

    /// Checks that exactly two positional arguments were passed, returning them.
    pub fn get_two_args(&self, name: &str) -> RunResult<(&'a Value, &'a Value)> {
        match self.values {
            [a, b] => Ok((a, b)),
            other => Err(ExcType::type_error_arg_count(name, 2, other.len())),
        }
    }

    /// Checks that zero or one argument was passed.
    pub fn get_zero_one_arg(&self, name: &str) -> RunResult<Option<&'a Value>> {
        match self.values {
            [] => Ok(None),
            [a] => Ok(Some(a)),
            other => Err(ExcType::type_error_at_most(name, 1, other.len())),
        }
    }

    /// Checks that one or two arguments were passed.
    pub fn get_one_two_args(&self, name: &str) -> RunResult<(&'a Value, Option<&'a Value>)> {
        match self.values {
            [a] => Ok((a, None)),
            [a, b] => Ok((a, Some(b))),
            [] => Err(ExcType::type_error_at_least(name, 1, 0)),
            other => Err(ExcType::type_error_at_most(name, 2, other.len())),
        }
    }

    /// Checks that zero, one or two arguments were passed.
    pub fn get_zero_one_two_args(&self, name: &str) -> RunResult<(Option<&'a Value>, Option<&'a Value>)> {
        match self.values {
            [] => Ok((None, None)),
            [a] => Ok((Some(a), None)),
            [a, b] => Ok((Some(a), Some(b))),
            other => Err(ExcType::type_error_at_most(name, 2, other.len())),
        }
    }

    /// Checks that one to three arguments were passed, as for `find(sub[, start[, end]])`.
    pub fn get_one_to_three_args(
        &self,
        name: &str,
    ) -> RunResult<(&'a Value, Option<&'a Value>, Option<&'a Value>)> {
        match self.values {
            [a] => Ok((a, None, None)),
            [a, b] => Ok((a, Some(b), None)),
            [a, b, c] => Ok((a, Some(b), Some(c))),
            [] => Err(ExcType::type_error_at_least(name, 1, 0)),
            other => Err(ExcType::type_error_at_most(name, 3, other.len())),
        }
    }
}

/// Reads an optional index argument where `None` also means "absent".
pub(crate) fn optional_index(value: Option<&Value>) -> RunResult<Option<i64>> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(v) => v.as_index().map(Some),
    }
}
