//! Pull-based operator protocol.
//!
//! Every query operator is an iterator with the lifecycle
//! `open -> (has_next / next)* -> close`; `rewind` is equivalent to closing
//! and reopening. Calling `next` past the end fails with
//! [`DbError::NoSuchElement`]; calling into an operator that is not open
//! fails with [`DbError::IllegalState`].
//!
//! Operators implement the two hooks ([`OpIterator::fetch_next`] and
//! [`OpIterator::base`]) and get the look-ahead `has_next`/`next` protocol
//! as provided methods, so the one-tuple caching lives here instead of in
//! every operator.

use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::common::exception::DbError;
use crate::storage::table::tuple::Tuple;

/// Open/closed state plus the single cached look-ahead tuple of an
/// operator.
#[derive(Debug, Default)]
pub struct Lookahead {
    open: bool,
    stash: Option<Tuple>,
}

impl Lookahead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_open(&mut self) {
        self.open = true;
        self.stash = None;
    }

    pub fn set_closed(&mut self) {
        self.open = false;
        self.stash = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn ensure_open(&self) -> Result<(), DbError> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::IllegalState)
        }
    }

    pub fn peek(&self) -> Option<&Tuple> {
        self.stash.as_ref()
    }

    pub fn stash(&mut self, tuple: Option<Tuple>) {
        self.stash = tuple;
    }

    pub fn take(&mut self) -> Option<Tuple> {
        self.stash.take()
    }
}

/// The capability set every query operator exposes.
pub trait OpIterator {
    /// Prepares the operator (and its children) to produce tuples.
    fn open(&mut self) -> Result<(), DbError>;

    /// Releases the operator's iteration state. Idempotent.
    fn close(&mut self);

    /// Restarts iteration from the beginning, equivalent to
    /// `close(); open()`.
    fn rewind(&mut self) -> Result<(), DbError>;

    /// Schema of the tuples this operator produces.
    fn get_tuple_desc(&self) -> Arc<Schema>;

    /// Child operators, for plan rewriting.
    fn get_children(&mut self) -> Vec<&mut dyn OpIterator>;

    /// Replaces the child operators, in the same order `get_children`
    /// reports them.
    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>);

    /// Implementation hook: produces the next tuple, or `None` at the end
    /// of the stream.
    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError>;

    /// Implementation hook: the operator's look-ahead state.
    fn base(&mut self) -> &mut Lookahead;

    /// True when another tuple is available.
    fn has_next(&mut self) -> Result<bool, DbError> {
        self.base().ensure_open()?;
        if self.base().peek().is_none() {
            let next = self.fetch_next()?;
            self.base().stash(next);
        }
        Ok(self.base().peek().is_some())
    }

    /// Returns the next tuple.
    fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }
        self.base().take().ok_or(DbError::NoSuchElement)
    }
}
