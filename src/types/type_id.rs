use serde::{Deserialize, Serialize};

use crate::common::config::{INT_FIELD_SIZE, STRING_FIELD_SIZE};

// The closed set of field types a heap file can store.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Int,
    String,
}

impl TypeId {
    /// On-disk width of a field of this type, in bytes.
    ///
    /// Both types are fixed width: integers are 4-byte big-endian two's
    /// complement; strings are a 4-byte big-endian length prefix followed by
    /// 128 zero-padded payload bytes.
    pub const fn get_size(&self) -> usize {
        match self {
            TypeId::Int => INT_FIELD_SIZE,
            TypeId::String => STRING_FIELD_SIZE,
        }
    }
}
