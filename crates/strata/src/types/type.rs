use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::value::ClassId;

/// Represents the Python type of a built-in value.
///
/// `Display` produces the name Python reports in error messages, and parsing
/// accepts the same names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    #[strum(serialize = "NoneType")]
    NoneType,
    #[strum(serialize = "NotImplementedType")]
    NotImplementedType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Bytearray,
    Tuple,
    List,
    Dict,
    /// A dynamic view of a dict's keys.
    #[strum(serialize = "dict_keys")]
    DictKeys,
    /// A dynamic view of a dict's values.
    #[strum(serialize = "dict_values")]
    DictValues,
    /// A dynamic view of a dict's (key, value) pairs.
    #[strum(serialize = "dict_items")]
    DictItems,
    Frozenset,
    Slice,
    #[strum(serialize = "builtin_function_or_method")]
    BuiltinFunction,
    /// Instances of classes owned by the object model.
    Object,
}

impl Type {
    /// True for types whose instances may serve as dict keys without consulting the object model.
    #[must_use]
    pub fn is_hashable(self) -> bool {
        !matches!(
            self,
            Self::List | Self::Dict | Self::Bytearray | Self::DictKeys | Self::DictItems
        )
    }
}

/// Runtime type identity used to key the dispatch cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKey {
    Builtin(Type),
    Class(ClassId),
}

impl From<Type> for TypeKey {
    fn from(ty: Type) -> Self {
        Self::Builtin(ty)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn python_names() {
        assert_eq!(Type::Bytearray.to_string(), "bytearray");
        assert_eq!(Type::DictItems.to_string(), "dict_items");
        assert_eq!(Type::NoneType.to_string(), "NoneType");
        assert_eq!("frozenset".parse::<Type>(), Ok(Type::Frozenset));
    }
}
