//! Session context: one KV transaction, one catalog transaction, one
//! schema transaction and the watermark they commit against.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error};

use crate::catalog::{Catalog, CatalogTxn};
use crate::common::{CancelToken, Error, Result};
use crate::kv::{KvStore, KvTransaction};
use crate::schema::{encode_key, Schema};
use crate::session::WaterMark;

/// Transactional state threaded through every executor.
pub struct SessionContext {
    txn: Arc<dyn KvTransaction>,
    catalog_txn: Mutex<Box<dyn CatalogTxn>>,
    schema_txn: Arc<dyn KvTransaction>,
    watermark: Arc<WaterMark>,
    cancel: CancelToken,
}

impl SessionContext {
    pub fn new(
        txn: Arc<dyn KvTransaction>,
        catalog_txn: Box<dyn CatalogTxn>,
        schema_txn: Arc<dyn KvTransaction>,
        watermark: Arc<WaterMark>,
    ) -> Self {
        Self {
            txn,
            catalog_txn: Mutex::new(catalog_txn),
            schema_txn,
            watermark,
            cancel: CancelToken::new(),
        }
    }

    /// Open all three transactions at `read_ts`.
    pub fn begin(
        kv: &dyn KvStore,
        schema_kv: &dyn KvStore,
        catalog: &dyn Catalog,
        watermark: Arc<WaterMark>,
        read_ts: u64,
        update: bool,
    ) -> Self {
        debug!(read_ts, update, "session begin");
        Self::new(
            kv.new_transaction_at(read_ts, update),
            catalog.begin(),
            schema_kv.new_transaction_at(read_ts, update),
            watermark,
        )
    }

    pub fn txn(&self) -> &Arc<dyn KvTransaction> {
        &self.txn
    }

    pub fn catalog_txn(&self) -> MutexGuard<'_, Box<dyn CatalogTxn>> {
        self.catalog_txn.lock()
    }

    pub fn schema_txn(&self) -> &Arc<dyn KvTransaction> {
        &self.schema_txn
    }

    pub fn watermark(&self) -> &Arc<WaterMark> {
        &self.watermark
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn read_ts(&self) -> u64 {
        self.txn.read_ts()
    }

    /// Stage `schema` in the schema transaction.
    pub fn put_schema(&self, schema: &Schema) -> Result<()> {
        self.schema_txn.set(&schema.encode_key(), &schema.encode_value())
    }

    pub fn get_schema(&self, namespace: &str, table: &str) -> Result<Schema> {
        let key = encode_key(namespace, table);
        match self.schema_txn.get(&key) {
            Ok(value) => Schema::decode(&key, &value),
            Err(e) if e.is_not_found() => {
                Err(Error::SchemaNotFound(format!("{}.{}", namespace, table)))
            }
            Err(e) => Err(e),
        }
    }

    /// Commit the KV transaction at `commit_ts`; on success commit the
    /// catalog and schema transactions too.
    ///
    /// A KV failure rolls everything back. Once the KV commit has succeeded
    /// it cannot be undone, so a later catalog or schema failure is logged
    /// and reported as `Error::CatalogDiverged`. The watermark is signalled
    /// for `commit_ts` in every case.
    pub fn commit_txn(&self, commit_ts: u64) -> Result<()> {
        self.watermark.begin(commit_ts);

        let mut kv_failed = false;
        let result = self.txn.commit_with(commit_ts, &mut |outcome| {
            if let Err(e) = outcome {
                kv_failed = true;
                return Err(e);
            }

            let mut failures = Vec::new();
            if let Err(e) = self.catalog_txn.lock().commit() {
                failures.push(format!("catalog: {}", e));
            }
            if let Err(e) = self.schema_txn.commit_at(commit_ts) {
                failures.push(format!("schema: {}", e));
            }
            if failures.is_empty() {
                return Ok(());
            }

            let reason = failures.join("; ");
            error!(commit_ts, %reason, "catalog diverged from committed kv state");
            Err(Error::CatalogDiverged { commit_ts, reason })
        });

        if kv_failed {
            self.catalog_txn.lock().rollback();
            self.schema_txn.discard();
        }
        self.watermark.done(commit_ts);
        debug!(commit_ts, ok = result.is_ok(), "session commit");
        result
    }

    /// Discard all three transactions.
    pub fn rollback_txn(&self) {
        self.txn.discard();
        self.schema_txn.discard();
        self.catalog_txn.lock().rollback();
        debug!(read_ts = self.read_ts(), "session rollback");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DbInfo, MemCatalog};
    use crate::kv::MemKv;

    struct Fixture {
        kv: MemKv,
        schema_kv: MemKv,
        catalog: MemCatalog,
        watermark: Arc<WaterMark>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                kv: MemKv::with_timestamp(1),
                schema_kv: MemKv::with_timestamp(1),
                catalog: MemCatalog::new(),
                watermark: Arc::new(WaterMark::with_done_until("txn", 1)),
            }
        }

        fn session(&self, read_ts: u64) -> SessionContext {
            SessionContext::begin(
                &self.kv,
                &self.schema_kv,
                &self.catalog,
                Arc::clone(&self.watermark),
                read_ts,
                true,
            )
        }
    }

    #[test]
    fn test_commit_applies_all_three() {
        let fx = Fixture::new();
        let ctx = fx.session(1);
        ctx.txn().set(b"row", b"v").unwrap();
        ctx.catalog_txn().create_db_info(DbInfo::new("casbin")).unwrap();
        ctx.put_schema(&Schema::of_strings("casbin", "policy", &["sub"])).unwrap();

        ctx.commit_txn(2).unwrap();
        assert_eq!(fx.watermark.done_until(), 2);

        let ctx = fx.session(2);
        assert_eq!(ctx.txn().get(b"row").unwrap(), b"v");
        assert!(ctx.catalog_txn().get_db_info_by_name("casbin").is_ok());
        assert_eq!(ctx.get_schema("casbin", "policy").unwrap().len(), 1);
    }

    #[test]
    fn test_kv_conflict_rolls_back_everything() {
        let fx = Fixture::new();
        let winner = fx.session(1);
        let loser = fx.session(1);
        winner.txn().set(b"k", b"1").unwrap();
        loser.txn().set(b"k", b"2").unwrap();
        loser.catalog_txn().create_db_info(DbInfo::new("lost")).unwrap();

        winner.commit_txn(2).unwrap();
        assert!(matches!(loser.commit_txn(3), Err(Error::Conflict)));
        assert_eq!(fx.catalog.db_count(), 0);
        assert_eq!(fx.watermark.done_until(), 3);
    }

    #[test]
    fn test_catalog_failure_after_kv_commit_diverges() {
        let fx = Fixture::new();
        let first = fx.session(1);
        let second = fx.session(1);
        first.catalog_txn().create_db_info(DbInfo::new("casbin")).unwrap();
        second.catalog_txn().create_db_info(DbInfo::new("casbin")).unwrap();
        second.txn().set(b"k", b"v").unwrap();

        first.commit_txn(2).unwrap();
        let err = second.commit_txn(3).unwrap_err();
        assert!(matches!(err, Error::CatalogDiverged { commit_ts: 3, .. }));
        // The KV half stays committed.
        assert_eq!(fx.session(3).txn().get(b"k").unwrap(), b"v");
        assert_eq!(fx.watermark.done_until(), 3);
    }

    #[test]
    fn test_rollback() {
        let fx = Fixture::new();
        let ctx = fx.session(1);
        ctx.txn().set(b"k", b"v").unwrap();
        ctx.catalog_txn().create_db_info(DbInfo::new("casbin")).unwrap();
        ctx.rollback_txn();

        assert!(ctx.commit_txn(2).is_err());
        assert_eq!(fx.kv.key_count(), 0);
        assert_eq!(fx.catalog.db_count(), 0);
    }

    #[test]
    fn test_missing_schema() {
        let fx = Fixture::new();
        let ctx = fx.session(1);
        assert!(matches!(
            ctx.get_schema("casbin", "nope"),
            Err(Error::SchemaNotFound(_))
        ));
    }
}
