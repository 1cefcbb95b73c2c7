use std::fmt;
use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::common::rid::RecordId;
use crate::types::field::Field;

/// A single row: a schema reference plus one field per column, and the
/// record id of its physical location once it has been stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    fields: Vec<Field>,
    rid: Option<RecordId>,
}

impl Tuple {
    /// Creates a tuple from its field values.
    ///
    /// # Panics
    ///
    /// Panics if the number of fields does not match the schema's arity.
    pub fn new(schema: Arc<Schema>, fields: Vec<Field>) -> Self {
        assert_eq!(
            fields.len(),
            schema.num_fields(),
            "field count does not match schema arity"
        );
        Self {
            schema,
            fields,
            rid: None,
        }
    }

    pub fn get_schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get_field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn set_field(&mut self, i: usize, field: Field) {
        self.fields[i] = field;
    }

    /// The physical location of this tuple, if it has been stored.
    pub fn get_record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Writes the tuple's wire encoding at the start of `out`, one fixed
    /// width field after another.
    pub fn serialize_to(&self, out: &mut [u8]) {
        let mut offset = 0;
        for (field, column) in self.fields.iter().zip(self.schema.get_columns()) {
            field.serialize_to(&mut out[offset..offset + column.get_size()]);
            offset += column.get_size();
        }
    }

    /// Parses a tuple of the given schema from the start of `data`.
    pub fn deserialize_from(data: &[u8], schema: Arc<Schema>) -> Self {
        let mut fields = Vec::with_capacity(schema.num_fields());
        let mut offset = 0;
        for column in schema.get_columns() {
            fields.push(Field::deserialize_from(&data[offset..], column.get_type()));
            offset += column.get_size();
        }
        Self {
            schema,
            fields,
            rid: None,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contents: Vec<String> = self.fields.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", contents.join(" "))
    }
}
