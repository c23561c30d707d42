//! Constant predicate evaluation.

use crate::codec::{ObjectId, Tuple};
use crate::common::{Error, Result};
use crate::executor::{ready, Executor, Row};
use crate::plan::ConstPlan;
use crate::schema::{Schema, Value};
use crate::session::SessionContext;

/// Evaluates a row-free predicate once and yields `[1]` or `[0]`.
pub struct ConstExecutor<'p> {
    plan: &'p ConstPlan,
    done: bool,
    initialized: bool,
}

impl<'p> ConstExecutor<'p> {
    pub fn new(plan: &'p ConstPlan) -> Self {
        Self {
            plan,
            done: false,
            initialized: false,
        }
    }
}

impl Executor for ConstExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, _ctx: &SessionContext) -> Result<()> {
        self.done = false;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Const", ctx)?;
        if self.done {
            return Ok(None);
        }
        self.done = true;
        match self.plan.predicate.evaluate_const()? {
            Value::Bool(b) => Ok(Some((Tuple::from_bool(b), ObjectId::EMPTY))),
            other => Err(Error::UnknownEvaluationResult(other.type_name().to_string())),
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
