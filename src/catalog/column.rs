use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::types::type_id::TypeId;

/// One entry of a schema: a field type plus an optional name.
///
/// Names exist only for lookup convenience; schema equality ignores them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: Option<String>,
    type_id: TypeId,
}

impl Column {
    pub fn new(name: impl Into<String>, type_id: TypeId) -> Self {
        Self {
            name: Some(name.into()),
            type_id,
        }
    }

    pub fn unnamed(type_id: TypeId) -> Self {
        Self {
            name: None,
            type_id,
        }
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get_type(&self) -> TypeId {
        self.type_id
    }

    /// Fixed on-disk width of a field of this column, in bytes.
    pub fn get_size(&self) -> usize {
        self.type_id.get_size()
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({:?})", name, self.type_id),
            None => write!(f, "({:?})", self.type_id),
        }
    }
}
