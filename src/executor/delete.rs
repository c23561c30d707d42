//! Row deletion.

use crate::codec::key::row_key;
use crate::common::Result;
use crate::executor::{delete_if_present, ready, BoxedExecutor, Executor, Row};
use crate::plan::DeletePlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Deletes every row its child yields, index entries included.
pub struct DeleteExecutor<'p> {
    plan: &'p DeletePlan,
    child: BoxedExecutor<'p>,
    deleted: usize,
    done: bool,
    initialized: bool,
}

impl<'p> DeleteExecutor<'p> {
    pub fn new(plan: &'p DeletePlan, child: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            child,
            deleted: 0,
            done: false,
            initialized: false,
        }
    }

    pub fn deleted(&self) -> usize {
        self.deleted
    }
}

impl Executor for DeleteExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        self.child.init(ctx)?;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Delete", ctx)?;
        if self.done {
            return Ok(None);
        }

        let table = &self.plan.table;
        while let Some((tuple, row_id)) = self.child.next(ctx)? {
            ctx.cancel_token().check()?;
            delete_if_present(ctx, &row_key(table.id, &row_id))?;
            for entry in table.index_entries(&tuple, &row_id)? {
                delete_if_present(ctx, &entry.key)?;
            }
            self.deleted += 1;
        }
        self.done = true;
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}
