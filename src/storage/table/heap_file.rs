//! Heap files: unordered tuple storage over a paged backing file.
//!
//! A heap file is a sequence of fixed-size slotted pages in ascending page
//! number order; the file length is always a whole number of pages except
//! transiently while a page is appended. All page access on behalf of a
//! transaction goes through the buffer pool so the locking protocol sees it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::vec;

use log::{info, trace};
use parking_lot::{Mutex, RwLock};
use xxhash_rust::xxh3::xxh3_64;

use crate::buffer::buffer_pool::{BufferPool, PageRef};
use crate::catalog::schema::Schema;
use crate::common::config::{TableId, TxnId};
use crate::common::exception::DbError;
use crate::concurrency::transaction::Permissions;
use crate::storage::page::heap_page::HeapPage;
use crate::storage::page::heap_page_id::HeapPageId;
use crate::storage::table::tuple::Tuple;

/// The catalog-facing contract of a table's storage.
///
/// The buffer pool loads and writes pages through this trait, and the DML
/// paths delegate tuple placement to it. Scans are driven by
/// [`HeapFileIterator`] on top of the same interface.
pub trait DbFile: Send + Sync {
    /// Stable id of this table for the life of the process.
    fn get_id(&self) -> TableId;

    fn get_schema(&self) -> &Arc<Schema>;

    /// Number of whole pages currently backing the table.
    fn num_pages(&self) -> Result<usize, DbError>;

    /// Reads one page image from disk, bypassing the cache.
    fn read_page(&self, pid: HeapPageId) -> Result<HeapPage, DbError>;

    /// Writes one page image to disk, growing the file as needed.
    fn write_page(&self, page: &HeapPage) -> Result<(), DbError>;

    /// Places a tuple on the first page with room, appending a fresh page
    /// when the file is full. Returns the modified pages for the caller to
    /// mark dirty and cache.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TxnId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>, DbError>;

    /// Clears the slot named by the tuple's record id. Returns the modified
    /// page.
    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TxnId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>, DbError>;
}

/// A table stored as a heap of slotted pages in a single file.
pub struct HeapFile {
    file: Mutex<File>,
    path: PathBuf,
    schema: Arc<Schema>,
    table_id: TableId,
    page_size: usize,
}

impl HeapFile {
    /// Opens (creating if absent) the heap file at `path`.
    ///
    /// The table id is the xxh3 hash of the file's absolute path, so the
    /// same table gets the same id every time it is opened within a
    /// process.
    pub fn new(
        path: impl AsRef<Path>,
        schema: Arc<Schema>,
        page_size: usize,
    ) -> Result<Self, DbError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let path = std::fs::canonicalize(path.as_ref())?;
        let table_id = xxh3_64(path.to_string_lossy().as_bytes());
        info!("opened heap file {:?} as table {}", path, table_id);
        Ok(Self {
            file: Mutex::new(file),
            path,
            schema,
            table_id,
            page_size,
        })
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size
    }
}

impl DbFile for HeapFile {
    fn get_id(&self) -> TableId {
        self.table_id
    }

    fn get_schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn num_pages(&self) -> Result<usize, DbError> {
        let len = self.file.lock().metadata()?.len() as usize;
        Ok(len.div_ceil(self.page_size))
    }

    fn read_page(&self, pid: HeapPageId) -> Result<HeapPage, DbError> {
        if pid.get_page_no() >= self.num_pages()? {
            return Err(DbError::PageNotFound(pid));
        }
        let offset = (pid.get_page_no() * self.page_size) as u64;
        let mut data = vec![0u8; self.page_size];

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        match file.read_exact(&mut data) {
            Ok(()) => {}
            Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // A trailing short page reads as zero-filled.
            }
            Err(e) => return Err(e.into()),
        }
        drop(file);

        trace!("read page {} from {:?}", pid, self.path);
        HeapPage::new(pid, &data, self.schema.clone())
    }

    fn write_page(&self, page: &HeapPage) -> Result<(), DbError> {
        let offset = (page.get_id().get_page_no() * self.page_size) as u64;
        let data = page.get_page_data();

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data)?;
        file.flush()?;
        trace!("wrote page {} to {:?}", page.get_id(), self.path);
        Ok(())
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TxnId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>, DbError> {
        // First fit: scan existing pages under a write lock.
        for page_no in 0..self.num_pages()? {
            let pid = HeapPageId::new(self.table_id, page_no);
            let page = pool.get_page(tid, pid, Permissions::ReadWrite)?;
            let has_space = page.read().get_num_empty_slots() > 0;
            if has_space {
                page.write().insert_tuple(tuple)?;
                return Ok(vec![page]);
            }
        }

        // Every page is full: append a fresh one to the backing file.
        let pid = HeapPageId::new(self.table_id, self.num_pages()?);
        let mut page = HeapPage::new(
            pid,
            &HeapPage::empty_page_data(self.page_size),
            self.schema.clone(),
        )?;
        page.insert_tuple(tuple)?;
        self.write_page(&page)?;
        trace!("appended page {} to {:?}", pid, self.path);
        Ok(vec![Arc::new(RwLock::new(page))])
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TxnId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>, DbError> {
        let rid = tuple.get_record_id().ok_or(DbError::MissingRecordId)?;
        let page = pool.get_page(tid, rid.get_page_id(), Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(vec![page])
    }
}

/// Pull-based scan over every live tuple of a table, in (page, slot) order.
///
/// Pages are fetched read-only through the buffer pool one at a time, so a
/// scan holds shared locks on every page it has visited, per strict 2PL.
pub struct HeapFileIterator {
    file: Arc<dyn DbFile>,
    pool: Arc<BufferPool>,
    tid: TxnId,
    page_no: usize,
    tuples: Option<Peekable<vec::IntoIter<Tuple>>>,
}

impl HeapFileIterator {
    pub fn new(file: Arc<dyn DbFile>, pool: Arc<BufferPool>, tid: TxnId) -> Self {
        Self {
            file,
            pool,
            tid,
            page_no: 0,
            tuples: None,
        }
    }

    pub fn open(&mut self) -> Result<(), DbError> {
        self.page_no = 0;
        self.tuples = if self.file.num_pages()? > 0 {
            Some(self.load_page(0)?)
        } else {
            None
        };
        Ok(())
    }

    pub fn has_next(&mut self) -> Result<bool, DbError> {
        if self.tuples.is_none() {
            return Ok(false);
        }
        loop {
            if let Some(tuples) = self.tuples.as_mut() {
                if tuples.peek().is_some() {
                    return Ok(true);
                }
            }
            if self.page_no + 1 >= self.file.num_pages()? {
                return Ok(false);
            }
            self.page_no += 1;
            let next = self.load_page(self.page_no)?;
            self.tuples = Some(next);
        }
    }

    pub fn next(&mut self) -> Result<Tuple, DbError> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }
        match self.tuples.as_mut().and_then(|tuples| tuples.next()) {
            Some(tuple) => Ok(tuple),
            None => Err(DbError::NoSuchElement),
        }
    }

    pub fn rewind(&mut self) -> Result<(), DbError> {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.tuples = None;
    }

    fn load_page(&self, page_no: usize) -> Result<Peekable<vec::IntoIter<Tuple>>, DbError> {
        let pid = HeapPageId::new(self.file.get_id(), page_no);
        let page = self.pool.get_page(self.tid, pid, Permissions::ReadOnly)?;
        let tuples: Vec<Tuple> = page.read().iter().cloned().collect();
        Ok(tuples.into_iter().peekable())
    }
}
