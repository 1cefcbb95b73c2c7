use std::sync::Arc;

use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::Schema;
use crate::common::config::{TableId, TxnId};
use crate::common::exception::DbError;
use crate::execution::op_iterator::{Lookahead, OpIterator};
use crate::storage::table::tuple::Tuple;
use crate::types::field::Field;
use crate::types::type_id::TypeId;

/// Inserts every tuple of its child into a table through the buffer pool
/// and yields a single one-field tuple holding the insert count.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TxnId,
    table_id: TableId,
    child: Box<dyn OpIterator>,
    output_schema: Arc<Schema>,
    done: bool,
    base: Lookahead,
}

impl Insert {
    /// Fails with [`DbError::SchemaMismatch`] when the child's tuples do
    /// not fit the target table.
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TxnId,
        table_id: TableId,
        child: Box<dyn OpIterator>,
    ) -> Result<Self, DbError> {
        let table_schema = pool.get_catalog().get_schema(table_id)?;
        if child.get_tuple_desc().as_ref() != table_schema.as_ref() {
            return Err(DbError::SchemaMismatch);
        }
        Ok(Self {
            pool,
            tid,
            table_id,
            child,
            output_schema: Arc::new(Schema::from_types(&[TypeId::Int])),
            done: false,
            base: Lookahead::new(),
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<(), DbError> {
        self.child.open()?;
        self.done = false;
        self.base.set_open();
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.base.set_closed();
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.child.rewind()?;
        self.done = false;
        self.base.set_open();
        Ok(())
    }

    fn get_tuple_desc(&self) -> Arc<Schema> {
        self.output_schema.clone()
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
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let mut count = 0;
        while self.child.has_next()? {
            let mut tuple = self.child.next()?;
            self.pool.insert_tuple(self.tid, self.table_id, &mut tuple)?;
            count += 1;
        }
        Ok(Some(Tuple::new(
            self.output_schema.clone(),
            vec![Field::Int(count)],
        )))
    }

    fn base(&mut self) -> &mut Lookahead {
        &mut self.base
    }
}
