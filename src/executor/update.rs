//! In-place row updates.

use crate::codec::key::row_key;
use crate::codec::Tuple;
use crate::common::Result;
use crate::executor::{delete_if_present, ready, BoxedExecutor, Executor, Row};
use crate::plan::UpdatePlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Rewrites every row its child yields.
///
/// Each update expression is evaluated against the original row. Index
/// entries that change are deleted and rewritten; row ids are kept.
pub struct UpdateExecutor<'p> {
    plan: &'p UpdatePlan,
    child: BoxedExecutor<'p>,
    updated: usize,
    done: bool,
    initialized: bool,
}

impl<'p> UpdateExecutor<'p> {
    pub fn new(plan: &'p UpdatePlan, child: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            child,
            updated: 0,
            done: false,
            initialized: false,
        }
    }

    /// Rows rewritten so far.
    pub fn updated(&self) -> usize {
        self.updated
    }

    fn apply(&self, tuple: &Tuple) -> Result<Tuple> {
        let schema = self.child.schema();
        let mut updated = tuple.clone();
        for (column, expr) in &self.plan.update_attrs {
            let value = expr.evaluate(tuple, schema)?;
            updated = updated.with_value(*column, &value.to_bytes())?;
        }
        Ok(updated)
    }
}

impl Executor for UpdateExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        self.child.init(ctx)?;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Update", ctx)?;
        if self.done {
            return Ok(None);
        }

        let table = &self.plan.table;
        let txn = ctx.txn();
        while let Some((tuple, row_id)) = self.child.next(ctx)? {
            ctx.cancel_token().check()?;
            let updated = self.apply(&tuple)?;

            let stale = table.index_entries(&tuple, &row_id)?;
            let fresh = table.index_entries(&updated, &row_id)?;
            for entry in stale.iter().filter(|e| !fresh.contains(e)) {
                delete_if_present(ctx, &entry.key)?;
            }
            txn.set(&row_key(table.id, &row_id), updated.as_bytes())?;
            for entry in fresh.iter().filter(|e| !stale.contains(e)) {
                txn.set(&entry.key, &entry.value)?;
            }
            self.updated += 1;
        }
        self.done = true;
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::key::{index_key_prefix, secondary_index_entry};
    use crate::codec::ObjectId;
    use crate::common::Error;
    use crate::executor::test_util::{policy_table, Env, NAMESPACE};
    use crate::executor::{build_executor, execute};
    use crate::expr::Expr;
    use crate::plan::PlanNode;

    fn seed(env: &Env) -> ObjectId {
        let table = policy_table();
        let plan = PlanNode::insert_values(
            &table,
            NAMESPACE,
            vec![Tuple::from_values(&["bob", "data1", "read", "allow"])],
        );
        let ctx = env.session(1);
        let mut exec = build_executor(&plan).unwrap();
        let rows = execute(exec.as_mut(), &ctx).unwrap();
        ctx.commit_txn(2).unwrap();
        rows[0].1
    }

    #[test]
    fn test_update_rewrites_row_and_indexes() {
        let env = Env::new();
        let rid = seed(&env);
        let table = policy_table();
        let plan = PlanNode::update(
            &table,
            vec![(0, Expr::lit("carol")), (3, Expr::lit("deny"))],
            PlanNode::seq_scan(&table, NAMESPACE, None),
        );

        let ctx = env.session(2);
        let mut exec = build_executor(&plan).unwrap();
        assert!(execute(exec.as_mut(), &ctx).unwrap().is_empty());

        let row = Tuple::from_bytes(ctx.txn().get(&row_key(1, &rid)).unwrap()).unwrap();
        assert_eq!(row.to_values()[0], b"carol");
        assert_eq!(row.to_values()[3], b"deny");

        let old = secondary_index_entry(1, &["bob"], &rid);
        let new = secondary_index_entry(1, &["carol"], &rid);
        assert!(matches!(ctx.txn().get(&old.key), Err(Error::KeyNotFound)));
        assert!(ctx.txn().get(&new.key).is_ok());
        // Index on `obj` did not change.
        assert!(ctx.txn().get(&secondary_index_entry(2, &["data1"], &rid).key).is_ok());

        let carol = build_executor(&PlanNode::index_scan(
            Arc::new(Schema::default()),
            1,
            false,
            index_key_prefix(1, &["carol"]),
        ))
        .and_then(|mut e| execute(e.as_mut(), &ctx))
        .unwrap();
        assert_eq!(carol.len(), 1);
    }

    #[test]
    fn test_update_expression_sees_old_row() {
        let env = Env::new();
        let rid = seed(&env);
        let table = policy_table();
        let plan = PlanNode::update(
            &table,
            vec![(0, Expr::lit("x")), (2, Expr::col(0))],
            PlanNode::seq_scan(&table, NAMESPACE, Some(Expr::col(0).eq(Expr::lit("bob")))),
        );
        let ctx = env.session(2);
        let mut exec = build_executor(&plan).unwrap();
        execute(exec.as_mut(), &ctx).unwrap();

        let row = Tuple::from_bytes(ctx.txn().get(&row_key(1, &rid)).unwrap()).unwrap();
        assert_eq!(row.to_values(), vec![b"x".to_vec(), b"data1".to_vec(), b"bob".to_vec(), b"allow".to_vec()]);
    }
}
