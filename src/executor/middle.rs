//! Materialized row source.

use crate::common::Result;
use crate::executor::{ready, Executor, Row};
use crate::plan::MiddlePlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Replays a pre-materialized list of rows.
pub struct MiddleExecutor<'p> {
    plan: &'p MiddlePlan,
    cursor: usize,
    initialized: bool,
}

impl<'p> MiddleExecutor<'p> {
    pub fn new(plan: &'p MiddlePlan) -> Self {
        Self {
            plan,
            cursor: 0,
            initialized: false,
        }
    }
}

impl Executor for MiddleExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, _ctx: &SessionContext) -> Result<()> {
        self.cursor = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Middle", ctx)?;
        let row = self.plan.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
