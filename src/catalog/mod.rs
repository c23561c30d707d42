//! Catalog contract.
//!
//! Databases, tables, columns and indexes are read and created through a
//! [`CatalogTxn`] opened from a [`Catalog`]. Metadata changes become visible
//! to other transactions only on commit.

mod info;
mod mem;

use crate::common::Result;

pub use info::{ColumnInfo, DbInfo, IndexInfo, TableInfo};
pub use mem::MemCatalog;

pub trait Catalog: Send + Sync {
    fn begin(&self) -> Box<dyn CatalogTxn>;
}

pub trait CatalogTxn: Send {
    /// Register a database, assigning ids to it and to any table or index
    /// whose id is zero. Returns the stored record.
    fn create_db_info(&mut self, info: DbInfo) -> Result<DbInfo>;

    fn get_db_info_by_id(&self, id: u64) -> Result<DbInfo>;

    fn get_db_info_by_name(&self, name: &str) -> Result<DbInfo>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self);
}
