//! First-row short circuit.

use crate::common::Result;
use crate::executor::{ready, BoxedExecutor, Executor, Row};
use crate::plan::ShortCircuitPlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Yields the first row of its child, then stops pulling.
pub struct ShortCircuitExecutor<'p> {
    plan: &'p ShortCircuitPlan,
    child: BoxedExecutor<'p>,
    done: bool,
    initialized: bool,
}

impl<'p> ShortCircuitExecutor<'p> {
    pub fn new(plan: &'p ShortCircuitPlan, child: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            child,
            done: false,
            initialized: false,
        }
    }
}

impl Executor for ShortCircuitExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        self.child.init(ctx)?;
        self.done = false;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "ShortCircuit", ctx)?;
        if self.done {
            return Ok(None);
        }
        self.done = true;
        self.child.next(ctx)
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}
