//! In-memory transactional catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::catalog::{Catalog, CatalogTxn, DbInfo};
use crate::common::{Error, Result};

#[derive(Debug)]
struct CatalogState {
    dbs: BTreeMap<u64, DbInfo>,
    next_db_id: u64,
    next_table_id: u64,
    next_index_id: u64,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            dbs: BTreeMap::new(),
            next_db_id: 1,
            next_table_id: 1,
            next_index_id: 1,
        }
    }
}

impl CatalogState {
    fn by_name(&self, name: &str) -> Option<&DbInfo> {
        self.dbs.values().find(|db| db.name == name)
    }

    /// Fill in zero ids and keep the counters ahead of every id in use.
    fn assign_ids(&mut self, info: &mut DbInfo) {
        if info.id == 0 {
            info.id = self.next_db_id;
        }
        self.next_db_id = self.next_db_id.max(info.id + 1);

        for table in &mut info.tables {
            if table.id == 0 {
                table.id = self.next_table_id;
            }
            self.next_table_id = self.next_table_id.max(table.id + 1);

            for index in &mut table.indices {
                if index.id == 0 {
                    index.id = self.next_index_id;
                }
                self.next_index_id = self.next_index_id.max(index.id + 1);
            }
        }
    }
}

/// Catalog kept in process memory; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn db_count(&self) -> usize {
        self.state.lock().dbs.len()
    }
}

impl Catalog for MemCatalog {
    fn begin(&self) -> Box<dyn CatalogTxn> {
        Box::new(MemCatalogTxn {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        })
    }
}

struct MemCatalogTxn {
    state: Arc<Mutex<CatalogState>>,
    pending: Vec<DbInfo>,
}

impl CatalogTxn for MemCatalogTxn {
    fn create_db_info(&mut self, mut info: DbInfo) -> Result<DbInfo> {
        let mut state = self.state.lock();
        if state.by_name(&info.name).is_some() || self.pending.iter().any(|db| db.name == info.name) {
            return Err(Error::DatabaseExists(info.name));
        }
        if info.id != 0 && (state.dbs.contains_key(&info.id) || self.pending.iter().any(|db| db.id == info.id)) {
            return Err(Error::DatabaseExists(format!("id {}", info.id)));
        }
        state.assign_ids(&mut info);
        debug!(db = %info.name, id = info.id, tables = info.tables.len(), "catalog create db");
        self.pending.push(info.clone());
        Ok(info)
    }

    fn get_db_info_by_id(&self, id: u64) -> Result<DbInfo> {
        if let Some(db) = self.pending.iter().find(|db| db.id == id) {
            return Ok(db.clone());
        }
        self.state
            .lock()
            .dbs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::DatabaseNotFound(format!("id {}", id)))
    }

    fn get_db_info_by_name(&self, name: &str) -> Result<DbInfo> {
        if let Some(db) = self.pending.iter().find(|db| db.name == name) {
            return Ok(db.clone());
        }
        self.state
            .lock()
            .by_name(name)
            .cloned()
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))
    }

    fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(dup) = self
            .pending
            .iter()
            .find(|db| state.dbs.contains_key(&db.id) || state.by_name(&db.name).is_some())
        {
            let name = dup.name.clone();
            self.pending.clear();
            return Err(Error::DatabaseExists(name));
        }
        for db in self.pending.drain(..) {
            state.dbs.insert(db.id, db);
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.pending.clear();
    }
}
