//! Write-ahead log collaborator.
//!
//! The cache layer calls [`LogManager::log_write`] with a page's before and
//! after images whenever it commits a dirty page or steals one through
//! eviction, and [`LogManager::force`] to make the log durable before a
//! commit returns. The record layout here is private to this module; nothing
//! replays it yet.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};

use log::{debug, info};
use parking_lot::Mutex;

use crate::common::config::TxnId;

/// Appends page update records to a log file.
///
/// Each record is framed as `[txn_id: u64][image_len: u32][before][after]`,
/// little-endian header, raw page bytes. Every append is flushed to the OS
/// before returning, so a record always precedes the page write it covers;
/// `force` additionally syncs the file to stable storage.
pub struct LogManager {
    log_file: Mutex<File>,
    enabled: bool,
    num_records: AtomicI32,
    num_forces: AtomicI32,
}

impl LogManager {
    pub fn new(log_path: &Path, enabled: bool) -> Result<Self, std::io::Error> {
        let log_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_path)?;
        info!("log manager opened {:?} (enabled: {})", log_path, enabled);
        Ok(Self {
            log_file: Mutex::new(log_file),
            enabled,
            num_records: AtomicI32::new(0),
            num_forces: AtomicI32::new(0),
        })
    }

    /// Appends an update record for a page written by `tid`.
    pub fn log_write(
        &self,
        tid: TxnId,
        before_image: &[u8],
        after_image: &[u8],
    ) -> Result<(), std::io::Error> {
        if !self.enabled {
            return Ok(());
        }
        debug_assert_eq!(before_image.len(), after_image.len());

        let mut file = self.log_file.lock();
        file.write_all(&tid.to_le_bytes())?;
        file.write_all(&(before_image.len() as u32).to_le_bytes())?;
        file.write_all(before_image)?;
        file.write_all(after_image)?;
        file.flush()?;

        self.num_records.fetch_add(1, Ordering::SeqCst);
        debug!("logged page update for txn {}", tid);
        Ok(())
    }

    /// Syncs the log to stable storage.
    pub fn force(&self) -> Result<(), std::io::Error> {
        if !self.enabled {
            return Ok(());
        }
        let file = self.log_file.lock();
        file.sync_all()?;
        self.num_forces.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn get_num_records(&self) -> i32 {
        self.num_records.load(Ordering::SeqCst)
    }

    pub fn get_num_forces(&self) -> i32 {
        self.num_forces.load(Ordering::SeqCst)
    }
}
