use std::fmt;

use crate::storage::table::tuple::Tuple;
use crate::types::field::{CmpOp, Field};

/// Compares one field of a tuple against a constant operand.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: CmpOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CmpOp, operand: Field) -> Self {
        Self { field, op, operand }
    }

    pub fn get_field(&self) -> usize {
        self.field
    }

    pub fn get_op(&self) -> CmpOp {
        self.op
    }

    pub fn get_operand(&self) -> &Field {
        &self.operand
    }

    /// True when the tuple's field satisfies `field <op> operand`.
    ///
    /// The field index must be valid for the tuple's schema.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        tuple.get_field(self.field).compare(self.op, &self.operand)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f[{}] {:?} {}", self.field, self.op, self.operand)
    }
}
