use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::config::{STRING_FIELD_SIZE, STRING_LEN};
use crate::types::type_id::TypeId;

/// Comparison operators a predicate can apply between two fields.
///
/// `Like` is substring containment and only holds between two strings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

/// A single typed value inside a tuple.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn get_type(&self) -> TypeId {
        match self {
            Field::Int(_) => TypeId::Int,
            Field::Str(_) => TypeId::String,
        }
    }

    /// Compares this field against `other` under `op`.
    ///
    /// Comparisons between mismatched types are always false.
    pub fn compare(&self, op: CmpOp, other: &Field) -> bool {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                CmpOp::Like => a == b,
            },
            (Field::Str(a), Field::Str(b)) => match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                CmpOp::Like => a.contains(b.as_str()),
            },
            _ => false,
        }
    }

    /// Writes the field's fixed-width wire encoding at the start of `out`.
    ///
    /// Integers: 4-byte big-endian two's complement. Strings: 4-byte
    /// big-endian length followed by 128 payload bytes, zero padded; data
    /// beyond 128 bytes is truncated.
    pub fn serialize_to(&self, out: &mut [u8]) {
        match self {
            Field::Int(v) => {
                out[..4].copy_from_slice(&v.to_be_bytes());
            }
            Field::Str(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(STRING_LEN);
                out[..4].copy_from_slice(&(len as u32).to_be_bytes());
                out[4..4 + len].copy_from_slice(&bytes[..len]);
                out[4 + len..STRING_FIELD_SIZE].fill(0);
            }
        }
    }

    /// Reads a field of the given type from the start of `data`.
    pub fn deserialize_from(data: &[u8], type_id: TypeId) -> Field {
        match type_id {
            TypeId::Int => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&data[..4]);
                Field::Int(i32::from_be_bytes(buf))
            }
            TypeId::String => {
                let mut len_buf = [0u8; 4];
                len_buf.copy_from_slice(&data[..4]);
                let len = (u32::from_be_bytes(len_buf) as usize).min(STRING_LEN);
                let payload = &data[4..4 + len];
                Field::Str(String::from_utf8_lossy(payload).into_owned())
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}
