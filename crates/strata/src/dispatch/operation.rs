//! Operation kinds the dispatch cache resolves.
//!
//! Each operation names the slot it looks up on a class (`__add__`,
//! `__getitem__`, a method name). `Display` produces that slot name.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

/// Binary arithmetic and bitwise operators.
///
/// `Display` gives the forward slot name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter, Serialize, Deserialize)]
pub enum BinaryOp {
    #[strum(serialize = "__add__")]
    Add,
    #[strum(serialize = "__sub__")]
    Sub,
    #[strum(serialize = "__mul__")]
    Mul,
    #[strum(serialize = "__truediv__")]
    TrueDiv,
    #[strum(serialize = "__floordiv__")]
    FloorDiv,
    #[strum(serialize = "__mod__")]
    Mod,
    #[strum(serialize = "__pow__")]
    Pow,
    #[strum(serialize = "__lshift__")]
    LShift,
    #[strum(serialize = "__rshift__")]
    RShift,
    #[strum(serialize = "__and__")]
    And,
    #[strum(serialize = "__or__")]
    Or,
    #[strum(serialize = "__xor__")]
    Xor,
    #[strum(serialize = "__matmul__")]
    MatMul,
}

impl BinaryOp {
    /// Operator symbol as it appears in `unsupported operand type(s) for +`.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::TrueDiv => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "** or pow()",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::MatMul => "@",
        }
    }

    /// Symbol of the augmented assignment form, e.g. `+=`.
    #[must_use]
    pub fn inplace_symbol(self) -> String {
        match self {
            Self::Pow => "**=".to_owned(),
            other => format!("{}=", other.symbol()),
        }
    }

    /// Slot name of the reflected operator, e.g. `__radd__`.
    #[must_use]
    pub fn reflected_name(self) -> String {
        let name: &'static str = self.into();
        format!("__r{}", &name_stem(name))
    }

    /// Slot name of the in-place operator, e.g. `__iadd__`.
    #[must_use]
    pub fn inplace_name(self) -> String {
        let name: &'static str = self.into();
        format!("__i{}", &name_stem(name))
    }
}

/// `__add__` -> `add__`
fn name_stem(dunder: &str) -> &str {
    dunder.strip_prefix("__").unwrap_or(dunder)
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum UnaryOp {
    #[strum(serialize = "__neg__")]
    Neg,
    #[strum(serialize = "__pos__")]
    Pos,
    #[strum(serialize = "__invert__")]
    Invert,
}

impl UnaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Invert => "~",
        }
    }
}

/// Rich comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter, Serialize, Deserialize)]
pub enum CompareOp {
    #[strum(serialize = "__lt__")]
    Lt,
    #[strum(serialize = "__le__")]
    Le,
    #[strum(serialize = "__eq__")]
    Eq,
    #[strum(serialize = "__ne__")]
    Ne,
    #[strum(serialize = "__gt__")]
    Gt,
    #[strum(serialize = "__ge__")]
    Ge,
}

impl CompareOp {
    /// The operator to try on the right operand when the left returns `NotImplemented`.
    #[must_use]
    pub fn reflected(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Applies the operator to an ordering result.
    #[must_use]
    pub fn matches(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }
}

/// A dispatchable operation.
///
/// Together with the receiver's [`crate::types::TypeKey`] this forms the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Binary(BinaryOp),
    ReflectedBinary(BinaryOp),
    InPlace(BinaryOp),
    Unary(UnaryOp),
    Compare(CompareOp),
    GetItem,
    SetItem,
    DelItem,
    Contains,
    Len,
    Bool,
    Hash,
    Repr,
    Call,
    /// Attribute read: `obj.name`.
    GetMember(Arc<str>),
    /// Method call: `obj.name(...)`.
    InvokeMember(Arc<str>),
}

impl Operation {
    /// Builds a method-call operation.
    #[must_use]
    pub fn method(name: &str) -> Self {
        Self::InvokeMember(Arc::from(name))
    }

    /// Builds an attribute-read operation.
    #[must_use]
    pub fn member(name: &str) -> Self {
        Self::GetMember(Arc::from(name))
    }

    /// Name of the slot this operation resolves on a class.
    #[must_use]
    pub fn slot_name(&self) -> String {
        self.to_string()
    }

    /// Whether a missing slot yields `NotImplemented` instead of raising.
    #[must_use]
    pub fn returns_not_implemented(&self) -> bool {
        matches!(
            self,
            Self::Binary(_) | Self::ReflectedBinary(_) | Self::InPlace(_) | Self::Compare(_)
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(op) => write!(f, "{op}"),
            Self::ReflectedBinary(op) => f.write_str(&op.reflected_name()),
            Self::InPlace(op) => f.write_str(&op.inplace_name()),
            Self::Unary(op) => write!(f, "{op}"),
            Self::Compare(op) => write!(f, "{op}"),
            Self::GetItem => f.write_str("__getitem__"),
            Self::SetItem => f.write_str("__setitem__"),
            Self::DelItem => f.write_str("__delitem__"),
            Self::Contains => f.write_str("__contains__"),
            Self::Len => f.write_str("__len__"),
            Self::Bool => f.write_str("__bool__"),
            Self::Hash => f.write_str("__hash__"),
            Self::Repr => f.write_str("__repr__"),
            Self::Call => f.write_str("__call__"),
            Self::GetMember(name) | Self::InvokeMember(name) => f.write_str(name),
        }
    }
}
