use std::sync::Arc;

use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::schema::Schema;
use crate::common::config::TxnId;
use crate::common::exception::DbError;
use crate::execution::op_iterator::{Lookahead, OpIterator};
use crate::storage::table::heap_file::{DbFile, HeapFileIterator};
use crate::storage::table::tuple::Tuple;

/// Sequential scan over every live tuple of one table, in (page, slot)
/// order, read-locking pages through the buffer pool as it goes.
pub struct SeqScan {
    file: Arc<dyn DbFile>,
    iter: HeapFileIterator,
    base: Lookahead,
}

impl SeqScan {
    pub fn new(pool: Arc<BufferPool>, file: Arc<dyn DbFile>, tid: TxnId) -> Self {
        let iter = HeapFileIterator::new(file.clone(), pool, tid);
        Self {
            file,
            iter,
            base: Lookahead::new(),
        }
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<(), DbError> {
        self.iter.open()?;
        self.base.set_open();
        Ok(())
    }

    fn close(&mut self) {
        self.iter.close();
        self.base.set_closed();
    }

    fn rewind(&mut self) -> Result<(), DbError> {
        self.iter.rewind()?;
        self.base.set_open();
        Ok(())
    }

    fn get_tuple_desc(&self) -> Arc<Schema> {
        self.file.get_schema().clone()
    }

    fn get_children(&mut self) -> Vec<&mut dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<Box<dyn OpIterator>>) {}

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        if self.iter.has_next()? {
            Ok(Some(self.iter.next()?))
        } else {
            Ok(None)
        }
    }

    fn base(&mut self) -> &mut Lookahead {
        &mut self.base
    }
}
