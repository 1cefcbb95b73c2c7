use std::path::PathBuf;
use std::time::Duration;

/** Waiters poll the lock manager every LOCK_RETRY_INTERVAL while blocked. */
pub static LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(2);

pub const DEFAULT_PAGE_SIZE: usize = 4096; // size of a data page in bytes
pub const DEFAULT_POOL_SIZE: usize = 50; // default number of cached pages
pub const STRING_LEN: usize = 128; // payload bytes of a string field
pub const STRING_FIELD_SIZE: usize = 4 + STRING_LEN; // length prefix + payload
pub const INT_FIELD_SIZE: usize = 4; // big-endian two's complement

pub type TableId = u64; // stable per-table id, hash of the backing path
pub type TxnId = u64; // transaction id type

/// Engine construction parameters.
///
/// `page_size` is a per-instance value so tests can build small pages; the
/// default matches the on-disk format of production heap files.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub page_size: usize,
    pub buffer_pool_size: usize,
    pub log_filename: PathBuf,
    pub enable_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_size: DEFAULT_POOL_SIZE,
            log_filename: PathBuf::from("heapdb.log"),
            enable_logging: false,
        }
    }
}
