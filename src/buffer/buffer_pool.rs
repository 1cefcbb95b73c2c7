//! Transactional page cache.
//!
//! The buffer pool is the single entry point for page access: operators and
//! heap files fetch pages through [`BufferPool::get_page`] under a
//! transaction id and a permission mode, and the pool coordinates the lock
//! manager, the cache table and the disk files behind it.
//!
//! The pool runs STEAL / NO-FORCE: eviction may flush an uncommitted dirty
//! page as long as its log record is appended first, and commit forces the
//! log but never writes pages. Abort discards a transaction's in-memory
//! changes by reloading its dirty pages from disk.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::catalog::catalog::Catalog;
use crate::common::config::{TableId, TxnId, LOCK_RETRY_INTERVAL};
use crate::common::exception::DbError;
use crate::concurrency::lock_manager::LockManager;
use crate::concurrency::transaction::Permissions;
use crate::recovery::log_manager::LogManager;
use crate::storage::page::heap_page::HeapPage;
use crate::storage::page::heap_page_id::HeapPageId;
use crate::storage::table::tuple::Tuple;

/// A cached page, shared between the pool and everyone it handed the page
/// to. Mutation happens under the page latch; the page-level lock protocol
/// decides who is allowed to take it.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Bounded cache of heap pages keyed by page id.
pub struct BufferPool {
    num_pages: usize,
    pages: Mutex<HashMap<HeapPageId, PageRef>>,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
    log_manager: Arc<LogManager>,
}

impl BufferPool {
    pub fn new(num_pages: usize, catalog: Arc<Catalog>, log_manager: Arc<LogManager>) -> Self {
        Self {
            num_pages,
            pages: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
            catalog,
            log_manager,
        }
    }

    pub fn get_capacity(&self) -> usize {
        self.num_pages
    }

    pub fn get_catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Number of pages currently cached.
    pub fn get_num_cached(&self) -> usize {
        self.pages.lock().len()
    }

    /// Fetches a page under the lock the permission mode calls for,
    /// blocking (by polling) until the lock is granted.
    ///
    /// A cached page is returned as is; a miss is read through the owning
    /// table's file, evicting a victim first when the pool is full.
    ///
    /// # Errors
    ///
    /// [`DbError::Abort`] when waiting for the lock would deadlock;
    /// [`DbError::PageNotFound`] for an out-of-range page id.
    pub fn get_page(
        &self,
        tid: TxnId,
        pid: HeapPageId,
        perm: Permissions,
    ) -> Result<PageRef, DbError> {
        loop {
            let acquired = {
                let _monitor = self.pages.lock();
                match perm {
                    Permissions::ReadWrite => self.lock_manager.acquire_exclusive(tid, pid)?,
                    Permissions::ReadOnly => self.lock_manager.acquire_shared(tid, pid)?,
                }
            };
            if acquired {
                break;
            }
            // Poll again shortly; the monitor is not held while sleeping.
            thread::sleep(LOCK_RETRY_INTERVAL);
        }

        let mut pool = self.pages.lock();
        if let Some(page) = pool.get(&pid) {
            trace!("page {} served from cache", pid);
            return Ok(page.clone());
        }

        if pool.len() >= self.num_pages {
            self.evict_page_locked(&mut pool)?;
        }
        let file = self.catalog.get_database_file(pid.get_table_id())?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        pool.insert(pid, page.clone());
        trace!("page {} loaded from disk", pid);
        Ok(page)
    }

    /// True when `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TxnId, pid: HeapPageId) -> bool {
        self.lock_manager.holds_exclusive(tid, pid) || self.lock_manager.holds_shared(tid, pid)
    }

    /// Releases `tid`'s locks on one page.
    ///
    /// Risky outside of `transaction_complete`: releasing early breaks
    /// strict two-phase locking.
    pub fn release_page(&self, tid: TxnId, pid: HeapPageId) {
        self.lock_manager.release_exclusive(tid, pid);
        self.lock_manager.release_shared(tid, pid);
    }

    /// Commits or aborts `tid` and releases everything it holds.
    ///
    /// Commit (NO-FORCE) appends a log record for every page `tid` dirtied,
    /// forces the log, and promotes each such page's current bytes to its
    /// before-image; pages are not written to disk. Abort reloads every
    /// page `tid` dirtied from disk, discarding the in-memory changes.
    pub fn transaction_complete(&self, tid: TxnId, commit: bool) -> Result<(), DbError> {
        let pool = self.pages.lock();
        if commit {
            for page in pool.values() {
                let mut page = page.write();
                if page.is_dirty() == Some(tid) {
                    self.log_manager
                        .log_write(tid, &page.get_before_image(), &page.get_page_data())?;
                    // Current contents become the undo image for the next
                    // transaction that touches this page.
                    page.set_before_image();
                }
            }
            self.log_manager.force()?;
            debug!("txn {} committed", tid);
        } else {
            for (pid, page) in pool.iter() {
                let dirtied = page.read().is_dirty() == Some(tid);
                if dirtied {
                    let file = self.catalog.get_database_file(pid.get_table_id())?;
                    *page.write() = file.read_page(*pid)?;
                }
            }
            debug!("txn {} aborted, dirty pages reloaded", tid);
        }

        for pid in pool.keys() {
            if self.holds_lock(tid, *pid) {
                self.release_page(tid, *pid);
            }
        }
        self.lock_manager.remove_dependency(tid);
        self.lock_manager.finish_transaction(tid);
        Ok(())
    }

    /// Adds a tuple to the named table on behalf of `tid`, write-locking
    /// every page it touches. Modified pages are marked dirty and
    /// (re)installed in the cache.
    pub fn insert_tuple(
        &self,
        tid: TxnId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<(), DbError> {
        let file = self.catalog.get_database_file(table_id)?;
        let modified = file.insert_tuple(self, tid, tuple)?;

        let mut pool = self.pages.lock();
        for page in modified {
            let pid = {
                let mut page = page.write();
                page.mark_dirty(true, tid);
                page.get_id()
            };
            if pool.len() >= self.num_pages && !pool.contains_key(&pid) {
                self.evict_page_locked(&mut pool)?;
            }
            pool.insert(pid, page);
        }
        Ok(())
    }

    /// Removes a tuple from its table on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TxnId, tuple: &Tuple) -> Result<(), DbError> {
        let rid = tuple.get_record_id().ok_or(DbError::MissingRecordId)?;
        let file = self
            .catalog
            .get_database_file(rid.get_page_id().get_table_id())?;
        let modified = file.delete_tuple(self, tid, tuple)?;

        let mut pool = self.pages.lock();
        for page in modified {
            let pid = {
                let mut page = page.write();
                page.mark_dirty(true, tid);
                page.get_id()
            };
            pool.insert(pid, page);
        }
        Ok(())
    }

    /// Writes one cached page through to disk if it is dirty, logging the
    /// before/after pair first.
    pub fn flush_page(&self, pid: HeapPageId) -> Result<(), DbError> {
        let mut pool = self.pages.lock();
        self.flush_page_locked(&mut pool, pid)
    }

    /// Flushes every cached page.
    ///
    /// Breaks NO-STEAL reasoning if anything still relies on it; the pool
    /// itself only calls per-page flushes through eviction.
    pub fn flush_all_pages(&self) -> Result<(), DbError> {
        let mut pool = self.pages.lock();
        let pids: Vec<HeapPageId> = pool.keys().copied().collect();
        for pid in pids {
            self.flush_page_locked(&mut pool, pid)?;
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it.
    pub fn discard_page(&self, pid: HeapPageId) {
        self.pages.lock().remove(&pid);
    }

    fn flush_page_locked(
        &self,
        pool: &mut HashMap<HeapPageId, PageRef>,
        pid: HeapPageId,
    ) -> Result<(), DbError> {
        if let Some(page) = pool.get(&pid) {
            let mut page = page.write();
            if let Some(dirtier) = page.is_dirty() {
                // Log record first, page bytes second.
                self.log_manager
                    .log_write(dirtier, &page.get_before_image(), &page.get_page_data())?;
                let file = self.catalog.get_database_file(pid.get_table_id())?;
                file.write_page(&page)?;
                page.mark_dirty(false, dirtier);
                debug!("flushed page {} (dirtied by txn {})", pid, dirtier);
            }
        }
        Ok(())
    }

    /// STEAL eviction: flushes a uniformly random victim and drops it.
    fn evict_page_locked(
        &self,
        pool: &mut HashMap<HeapPageId, PageRef>,
    ) -> Result<(), DbError> {
        let victims: Vec<HeapPageId> = pool.keys().copied().collect();
        if victims.is_empty() {
            return Ok(());
        }
        let victim = victims[rand::thread_rng().gen_range(0..victims.len())];
        self.flush_page_locked(pool, victim)?;
        pool.remove(&victim);
        debug!("evicted page {}", victim);
        Ok(())
    }
}
