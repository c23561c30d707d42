//! Secondary and primary index scans.

use crate::codec::key::{row_id_from_primary_value, row_id_from_secondary_key};
use crate::codec::Tuple;
use crate::common::{Error, Result};
use crate::executor::{ready, Executor, Row};
use crate::kv::{IteratorOptions, KvIterator};
use crate::plan::IndexScanPlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Walks index entries under a key prefix and yields their row ids with an
/// empty tuple. Stack a [`TableRowIdScanExecutor`](super::TableRowIdScanExecutor)
/// on top to fetch the rows.
pub struct IndexScanExecutor<'p> {
    plan: &'p IndexScanPlan,
    iter: Option<Box<dyn KvIterator>>,
}

impl<'p> IndexScanExecutor<'p> {
    pub fn new(plan: &'p IndexScanPlan) -> Self {
        Self { plan, iter: None }
    }
}

impl Executor for IndexScanExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        let mut iter = ctx
            .txn()
            .new_iterator(IteratorOptions::with_prefix(self.plan.prefix.clone()))?;
        iter.seek(&self.plan.prefix);
        self.iter = Some(iter);
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.iter.is_some(), "IndexScan", ctx)?;
        let Some(iter) = self.iter.as_mut() else {
            return Err(Error::NotInitialized("IndexScan"));
        };
        if !iter.valid_for_prefix(&self.plan.prefix) {
            return Ok(None);
        }
        let Some(item) = iter.item() else {
            return Ok(None);
        };
        let row_id = if self.plan.primary {
            row_id_from_primary_value(item.value())?
        } else {
            row_id_from_secondary_key(item.key())?
        };
        iter.next();
        Ok(Some((Tuple::default(), row_id)))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut iter) = self.iter.take() {
            iter.close();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::key::{index_key_prefix, primary_index_entry, secondary_index_entry};
    use crate::codec::ObjectId;
    use crate::executor::execute;
    use crate::executor::test_util::Env;
    use crate::plan::PlanNode;

    #[test]
    fn test_secondary_prefix() {
        let env = Env::new();
        let ctx = env.session(1);
        let (bob1, bob2, bobby) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        for (name, rid) in [("bob", &bob1), ("bob", &bob2), ("bobby", &bobby)] {
            let entry = secondary_index_entry(1, &[name], rid);
            ctx.txn().set(&entry.key, &entry.value).unwrap();
        }
        ctx.commit_txn(2).unwrap();

        let plan = PlanNode::index_scan(Arc::new(Schema::default()), 1, false, index_key_prefix(1, &["bob"]));
        let PlanNode::IndexScan(scan) = &plan else { unreachable!() };
        let rows = execute(&mut IndexScanExecutor::new(scan), &env.session(2)).unwrap();

        let mut got: Vec<_> = rows.into_iter().map(|(_, rid)| rid).collect();
        got.sort();
        let mut want = vec![bob1, bob2];
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn test_primary_reads_value() {
        let env = Env::new();
        let ctx = env.session(1);
        let rid = ObjectId::new();
        let entry = primary_index_entry(5, &["alice"], 1, &rid);
        ctx.txn().set(&entry.key, &entry.value).unwrap();
        ctx.commit_txn(2).unwrap();

        let plan = PlanNode::index_scan(Arc::new(Schema::default()), 5, true, index_key_prefix(5, &["alice"]));
        let PlanNode::IndexScan(scan) = &plan else { unreachable!() };
        let rows = execute(&mut IndexScanExecutor::new(scan), &env.session(2)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, rid);
        assert!(rows[0].0.is_empty());
    }
}
