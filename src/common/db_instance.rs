use std::sync::Arc;

use log::info;

use crate::buffer::buffer_pool::BufferPool;
use crate::catalog::catalog::Catalog;
use crate::catalog::schema::Schema;
use crate::common::config::{DbConfig, TableId};
use crate::common::exception::DbError;
use crate::recovery::log_manager::LogManager;
use crate::storage::table::heap_file::HeapFile;

/// Owns the engine's long-lived collaborators and wires them together.
///
/// The catalog, buffer pool and log manager are reached through this context
/// value rather than process-wide singletons, so tests can run several
/// engines side by side with different page sizes.
pub struct Database {
    config: DbConfig,
    catalog: Arc<Catalog>,
    log_manager: Arc<LogManager>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(config: DbConfig) -> Result<Self, DbError> {
        let catalog = Arc::new(Catalog::new());
        let log_manager = Arc::new(LogManager::new(
            &config.log_filename,
            config.enable_logging,
        )?);
        let buffer_pool = Arc::new(BufferPool::new(
            config.buffer_pool_size,
            catalog.clone(),
            log_manager.clone(),
        ));
        info!(
            "database up (page size {}, pool {} pages)",
            config.page_size, config.buffer_pool_size
        );
        Ok(Self {
            config,
            catalog,
            log_manager,
            buffer_pool,
        })
    }

    pub fn get_config(&self) -> &DbConfig {
        &self.config
    }

    pub fn get_page_size(&self) -> usize {
        self.config.page_size
    }

    pub fn get_catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn get_buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    pub fn get_log_manager(&self) -> &Arc<LogManager> {
        &self.log_manager
    }

    /// Opens the heap file at `path` with this database's page size and
    /// registers it in the catalog under `name`.
    pub fn open_table(
        &self,
        name: &str,
        path: impl AsRef<std::path::Path>,
        schema: Arc<Schema>,
    ) -> Result<TableId, DbError> {
        let file = Arc::new(HeapFile::new(path, schema, self.config.page_size)?);
        Ok(self.catalog.add_table(name, file))
    }
}
