//! Container types and the helpers they share.
//!
//! Every mutable container is an `Arc` handle around a [`crate::Monitor`];
//! element comparisons never run while that lock is held.

pub mod bytearray;
pub mod bytes;
pub mod dict;
pub mod dict_views;
pub mod growable;
pub mod list;
pub mod set;
pub mod slice;
pub(crate) mod table;
pub mod r#type;

pub use crate::types::{
    bytearray::{ByteArray, ByteArrayIter},
    bytes::Bytes,
    dict::{Dict, DictIter},
    dict_views::{DictItems, DictKeys, DictValues},
    growable::GrowableArray,
    list::{List, ListIter},
    set::{FrozenSet, SetStorage},
    slice::{Slice, SliceIndices},
    r#type::{Type, TypeKey},
};
