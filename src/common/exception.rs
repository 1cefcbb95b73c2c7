use thiserror::Error;

use crate::common::config::{TableId, TxnId};
use crate::storage::page::heap_page_id::HeapPageId;

/// Raised when the lock manager refuses a lock because granting it would
/// close a cycle in the wait-for graph, or when a caller aborts explicitly.
///
/// Fatal to the requesting transaction: by the time this reaches the caller
/// of `transaction_complete`, every lock and dirty page of the transaction
/// has been purged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("transaction {txn_id} aborted")]
pub struct TransactionAbortedError {
    pub txn_id: TxnId,
}

impl TransactionAbortedError {
    pub fn new(txn_id: TxnId) -> Self {
        Self { txn_id }
    }
}

/// Engine-level failures surfaced by the storage and execution layers.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("page {0} is out of range for its heap file")]
    PageNotFound(HeapPageId),
    #[error("no free slot on page {0}")]
    NoSpace(HeapPageId),
    #[error("tuple schema does not match the table schema")]
    SchemaMismatch,
    #[error("tuple does not live on page {0}")]
    NotOnPage(HeapPageId),
    #[error("slot {slot} of page {pid} is empty")]
    SlotEmpty { pid: HeapPageId, slot: usize },
    #[error("tuple has no record id")]
    MissingRecordId,
    #[error("no table with id {0} in the catalog")]
    NoSuchTable(TableId),
    #[error("no field named {0:?} in the schema")]
    NoSuchField(String),
    #[error("iterator exhausted")]
    NoSuchElement,
    #[error("operator is not open")]
    IllegalState,
    #[error("{0}")]
    IllegalArgument(String),
    #[error(transparent)]
    Abort(#[from] TransactionAbortedError),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
