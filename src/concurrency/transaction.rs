use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::common::config::TxnId;

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Access mode a transaction requests when fetching a page.
///
/// `ReadOnly` maps to a shared page lock, `ReadWrite` to an exclusive one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// A running transaction, identified by a process-unique id.
///
/// Ids are issued from a monotonically increasing counter and are never
/// reused for the life of the process, which the wait-for graph and the
/// dirty-page bookkeeping both rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transaction {
    txn_id: TxnId,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            txn_id: NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst),
        }
    }

    pub fn get_id(&self) -> TxnId {
        self.txn_id
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
