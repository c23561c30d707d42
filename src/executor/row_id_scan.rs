//! Row lookup by row id.

use tracing::debug;

use crate::codec::key::row_key;
use crate::codec::Tuple;
use crate::common::Result;
use crate::executor::{ready, BoxedExecutor, Executor, Row};
use crate::plan::TableRowIdScanPlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Fetches the row behind every row id its child yields.
pub struct TableRowIdScanExecutor<'p> {
    plan: &'p TableRowIdScanPlan,
    child: BoxedExecutor<'p>,
    initialized: bool,
}

impl<'p> TableRowIdScanExecutor<'p> {
    pub fn new(plan: &'p TableRowIdScanPlan, child: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            child,
            initialized: false,
        }
    }
}

impl Executor for TableRowIdScanExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        self.child.init(ctx)?;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        loop {
            ready(self.initialized, "TableRowIdScan", ctx)?;
            let Some((_, row_id)) = self.child.next(ctx)? else {
                return Ok(None);
            };
            match ctx.txn().get(&row_key(self.plan.table_id, &row_id)) {
                Ok(bytes) => return Ok(Some((Tuple::from_bytes(bytes)?, row_id))),
                // Index entry outlived its row within this snapshot.
                Err(e) if e.is_not_found() => {
                    debug!(table = self.plan.table_id, %row_id, "dangling index entry");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}
