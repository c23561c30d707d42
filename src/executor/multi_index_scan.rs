//! Intersection of two index scans.

use std::collections::HashMap;

use crate::codec::{ObjectId, Tuple};
use crate::common::Result;
use crate::executor::{ready, BoxedExecutor, Executor, Row};
use crate::plan::MultiIndexScanPlan;
use crate::schema::{merge_modifier, Schema};
use crate::session::SessionContext;

/// Hash intersection of two row streams on row id.
///
/// The left child is read in full into a table on the first `next`; the
/// right child is then streamed and every row whose id is in the table
/// yields the merged tuple. Put the smaller side on the left.
pub struct MultiIndexScanExecutor<'p> {
    plan: &'p MultiIndexScanPlan,
    left: BoxedExecutor<'p>,
    right: BoxedExecutor<'p>,
    built: Option<HashMap<ObjectId, Tuple>>,
    initialized: bool,
}

impl<'p> MultiIndexScanExecutor<'p> {
    pub fn new(plan: &'p MultiIndexScanPlan, left: BoxedExecutor<'p>, right: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            left,
            right,
            built: None,
            initialized: false,
        }
    }

    fn build_side(&mut self, ctx: &SessionContext) -> Result<HashMap<ObjectId, Tuple>> {
        let mut table = HashMap::new();
        while let Some((tuple, row_id)) = self.left.next(ctx)? {
            ctx.cancel_token().check()?;
            table.insert(row_id, tuple);
        }
        Ok(table)
    }
}

impl Executor for MultiIndexScanExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        self.left.init(ctx)?;
        self.right.init(ctx)?;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "MultiIndexScan", ctx)?;
        if self.built.is_none() {
            let table = self.build_side(ctx)?;
            self.built = Some(table);
        }

        loop {
            ctx.cancel_token().check()?;
            let Some((right_tuple, row_id)) = self.right.next(ctx)? else {
                return Ok(None);
            };
            let Some(left_tuple) = self.built.as_ref().and_then(|t| t.get(&row_id)) else {
                continue;
            };
            let merged = merge_modifier(
                left_tuple,
                self.left.schema(),
                &right_tuple,
                self.right.schema(),
            )?;
            return Ok(Some((merged, row_id)));
        }
    }

    fn close(&mut self) -> Result<()> {
        self.built = None;
        let left = self.left.close();
        let right = self.right.close();
        left.and(right)
    }
}
