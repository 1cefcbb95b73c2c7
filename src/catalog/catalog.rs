use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::catalog::schema::Schema;
use crate::common::config::TableId;
use crate::common::exception::DbError;
use crate::storage::table::heap_file::DbFile;

/// Metadata about a registered table.
#[derive(Clone)]
pub struct TableInfo {
    name: String,
    file: Arc<dyn DbFile>,
}

impl TableInfo {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_file(&self) -> &Arc<dyn DbFile> {
        &self.file
    }
}

/// Registry of the tables the engine knows about, keyed by their stable
/// table id. The buffer pool resolves page ids to their backing files here.
pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableInfo>>,
    names: RwLock<HashMap<String, TableId>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a table under a name. A table re-registered under the same
    /// name replaces the previous entry.
    pub fn add_table(&self, name: impl Into<String>, file: Arc<dyn DbFile>) -> TableId {
        let name = name.into();
        let table_id = file.get_id();
        info!("catalog: registered table {:?} with id {}", name, table_id);
        self.names.write().insert(name.clone(), table_id);
        self.tables.write().insert(table_id, TableInfo { name, file });
        table_id
    }

    pub fn get_database_file(&self, table_id: TableId) -> Result<Arc<dyn DbFile>, DbError> {
        self.tables
            .read()
            .get(&table_id)
            .map(|info| info.file.clone())
            .ok_or(DbError::NoSuchTable(table_id))
    }

    pub fn get_schema(&self, table_id: TableId) -> Result<Arc<Schema>, DbError> {
        Ok(self.get_database_file(table_id)?.get_schema().clone())
    }

    pub fn get_table_id(&self, name: &str) -> Result<TableId, DbError> {
        self.names
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| DbError::IllegalArgument(format!("no table named {:?}", name)))
    }

    pub fn get_table_name(&self, table_id: TableId) -> Result<String, DbError> {
        self.tables
            .read()
            .get(&table_id)
            .map(|info| info.name.clone())
            .ok_or(DbError::NoSuchTable(table_id))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
