//! Schema definition for heap-file tables.
//!
//! A schema is an ordered, non-empty sequence of columns with a fixed total
//! byte width. Tuples of a schema serialize each field back to back at fixed
//! offsets, so `byte_size` fully determines the slot size of a heap page.

use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::catalog::column::Column;
use crate::common::exception::DbError;
use crate::types::type_id::TypeId;

/// The structure of a table row: an ordered collection of columns.
///
/// Two schemas are equal when they have the same arity and the same type at
/// every index; column names are ignored.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema from its columns.
    ///
    /// # Panics
    ///
    /// Panics if `columns` is empty; a schema must describe at least one
    /// field.
    pub fn new(columns: Vec<Column>) -> Self {
        assert!(!columns.is_empty(), "a schema needs at least one column");
        Self { columns }
    }

    /// Convenience constructor from parallel type/name slices.
    pub fn from_types_and_names(types: &[TypeId], names: &[&str]) -> Self {
        assert_eq!(types.len(), names.len());
        Self::new(
            types
                .iter()
                .zip(names.iter())
                .map(|(t, n)| Column::new(*n, *t))
                .collect(),
        )
    }

    /// Convenience constructor for anonymous columns.
    pub fn from_types(types: &[TypeId]) -> Self {
        Self::new(types.iter().map(|t| Column::unnamed(*t)).collect())
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn get_columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_field_type(&self, i: usize) -> Result<TypeId, DbError> {
        self.columns
            .get(i)
            .map(Column::get_type)
            .ok_or(DbError::NoSuchElement)
    }

    pub fn get_field_name(&self, i: usize) -> Result<Option<&str>, DbError> {
        self.columns
            .get(i)
            .map(Column::get_name)
            .ok_or(DbError::NoSuchElement)
    }

    /// Finds the index of the first column with the given name.
    pub fn field_name_to_index(&self, name: &str) -> Result<usize, DbError> {
        self.columns
            .iter()
            .position(|c| c.get_name() == Some(name))
            .ok_or_else(|| DbError::NoSuchField(name.to_string()))
    }

    /// Byte offset of field `i` within a serialized tuple.
    pub fn field_offset(&self, i: usize) -> usize {
        self.columns[..i].iter().map(Column::get_size).sum()
    }

    /// The fixed size in bytes of tuples with this schema.
    pub fn byte_size(&self) -> usize {
        self.columns.iter().map(Column::get_size).sum()
    }

    /// Concatenates two schemas, the left one's columns first.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let mut columns = Vec::with_capacity(left.num_fields() + right.num_fields());
        columns.extend_from_slice(&left.columns);
        columns.extend_from_slice(&right.columns);
        Schema { columns }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.num_fields() == other.num_fields()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.get_type() == b.get_type())
    }
}

impl Eq for Schema {}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rep: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", rep.join(","))
    }
}
