//! Page-level lock manager.
//!
//! Grants shared and exclusive locks on heap pages under strict two-phase
//! locking: a transaction's locks are only released when it completes.
//! Conflicting requests do not block inside the manager; the caller polls,
//! and every refused request records wait-for edges first. A request whose
//! edges would close a cycle in the wait-for graph is refused permanently
//! with [`TransactionAbortedError`], so the graph stays acyclic after every
//! operation.
//!
//! All state sits behind a single coarse monitor. Contention on it is
//! acceptable at this scale and keeps the deadlock reasoning local.

use std::collections::{HashMap, HashSet};

use log::debug;
use parking_lot::Mutex;

use crate::common::config::TxnId;
use crate::common::exception::TransactionAbortedError;
use crate::storage::page::heap_page_id::HeapPageId;

#[derive(Default)]
struct LockTables {
    /// Pages under an exclusive lock, and the transaction holding it.
    exclusive: HashMap<HeapPageId, TxnId>,
    /// Pages under shared locks, and every transaction holding one.
    shared: HashMap<HeapPageId, HashSet<TxnId>>,
    /// Edge `t1 -> t2` means t1 is waiting on a lock t2 holds.
    waits_for: HashMap<TxnId, HashSet<TxnId>>,
}

impl LockTables {
    fn add_shared(&mut self, tid: TxnId, pid: HeapPageId) {
        self.shared.entry(pid).or_default().insert(tid);
    }

    fn add_edge(&mut self, waiter: TxnId, holder: TxnId) {
        self.waits_for.entry(waiter).or_default().insert(holder);
    }

    /// Depth-first reachability over the wait-for graph.
    ///
    /// Adding `tid -> holder` closes a cycle exactly when a path
    /// `holder -> ... -> tid` already exists.
    fn reaches(&self, from: TxnId, to: TxnId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = self.waits_for.get(&node) {
                for &n in next {
                    if n == to {
                        return true;
                    }
                    stack.push(n);
                }
            }
        }
        false
    }

    /// Refuses with an abort if waiting on `holder` would deadlock,
    /// otherwise records the wait edge.
    fn wait_or_abort(&mut self, tid: TxnId, holder: TxnId) -> Result<(), TransactionAbortedError> {
        if self.reaches(holder, tid) {
            debug!("deadlock: txn {} waiting on txn {} closes a cycle", tid, holder);
            return Err(TransactionAbortedError::new(tid));
        }
        self.add_edge(tid, holder);
        Ok(())
    }
}

/// Shared/exclusive page locks with wait-for-graph deadlock detection.
pub struct LockManager {
    tables: Mutex<LockTables>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(LockTables::default()),
        }
    }

    /// Attempts a shared lock. Returns `Ok(true)` when granted, `Ok(false)`
    /// when the caller has to retry, and an abort when waiting would
    /// deadlock.
    pub fn acquire_shared(
        &self,
        tid: TxnId,
        pid: HeapPageId,
    ) -> Result<bool, TransactionAbortedError> {
        let mut t = self.tables.lock();
        if let Some(&holder) = t.exclusive.get(&pid) {
            if holder != tid {
                t.wait_or_abort(tid, holder)?;
                return Ok(false);
            }
        }
        // No exclusive holder, or we hold the exclusive lock ourselves.
        t.add_shared(tid, pid);
        Ok(true)
    }

    /// Attempts an exclusive lock, upgrading a solely held shared lock in
    /// place. Same return contract as [`Self::acquire_shared`].
    pub fn acquire_exclusive(
        &self,
        tid: TxnId,
        pid: HeapPageId,
    ) -> Result<bool, TransactionAbortedError> {
        let mut t = self.tables.lock();
        if let Some(&holder) = t.exclusive.get(&pid) {
            if holder == tid {
                return Ok(true);
            }
            t.wait_or_abort(tid, holder)?;
            return Ok(false);
        }

        let holders: Vec<TxnId> = t
            .shared
            .get(&pid)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();

        if holders.is_empty() {
            t.exclusive.insert(pid, tid);
            return Ok(true);
        }
        if holders == [tid] {
            // Upgrade: the only reader becomes the writer.
            if let Some(s) = t.shared.get_mut(&pid) {
                s.remove(&tid);
            }
            t.exclusive.insert(pid, tid);
            return Ok(true);
        }
        for &holder in holders.iter().filter(|&&h| h != tid) {
            t.wait_or_abort(tid, holder)?;
        }
        Ok(false)
    }

    pub fn holds_shared(&self, tid: TxnId, pid: HeapPageId) -> bool {
        self.tables
            .lock()
            .shared
            .get(&pid)
            .is_some_and(|s| s.contains(&tid))
    }

    pub fn holds_exclusive(&self, tid: TxnId, pid: HeapPageId) -> bool {
        self.tables.lock().exclusive.get(&pid) == Some(&tid)
    }

    pub fn release_shared(&self, tid: TxnId, pid: HeapPageId) {
        if let Some(holders) = self.tables.lock().shared.get_mut(&pid) {
            holders.remove(&tid);
        }
    }

    pub fn release_exclusive(&self, tid: TxnId, pid: HeapPageId) {
        let mut t = self.tables.lock();
        if t.exclusive.get(&pid) == Some(&tid) {
            t.exclusive.remove(&pid);
        }
    }

    /// Drops `tid` from the wait-for graph, both as a waiter and as a
    /// target of other waiters.
    pub fn remove_dependency(&self, tid: TxnId) {
        let mut t = self.tables.lock();
        t.waits_for.remove(&tid);
        for waiters in t.waits_for.values_mut() {
            waiters.remove(&tid);
        }
    }

    /// Releases every lock `tid` still holds.
    pub fn finish_transaction(&self, tid: TxnId) {
        let mut t = self.tables.lock();
        for holders in t.shared.values_mut() {
            holders.remove(&tid);
        }
        t.exclusive.retain(|_, holder| *holder != tid);
        debug!("released all locks of txn {}", tid);
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
