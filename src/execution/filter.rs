use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::common::exception::DbError;
use crate::execution::op_iterator::{Lookahead, OpIterator};
use crate::execution::predicate::Predicate;
use crate::storage::table::tuple::Tuple;

/// Relational selection: passes through the child tuples a predicate
/// accepts.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    base: Lookahead,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            base: Lookahead::new(),
        }
    }

    pub fn get_predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<(), DbError> {
        self.child.open()?;
        self.base.set_open();
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.base.set_closed();
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.child.rewind()?;
        self.base.set_open();
        Ok(())
    }

    fn get_tuple_desc(&self) -> Arc<Schema> {
        self.child.get_tuple_desc()
    }

    fn get_children(&mut self) -> Vec<&mut dyn OpIterator> {
        vec![self.child.as_mut()]
    }

    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>) {
        if let Some(child) = children.into_iter().next() {
            self.child = child;
        }
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        while self.child.has_next()? {
            let tuple = self.child.next()?;
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn base(&mut self) -> &mut Lookahead {
        &mut self.base
    }
}
