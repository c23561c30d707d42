//! Row count limit.

use crate::common::Result;
use crate::executor::{ready, BoxedExecutor, Executor, Row};
use crate::plan::LimitPlan;
use crate::schema::Schema;
use crate::session::SessionContext;

pub struct LimitExecutor<'p> {
    plan: &'p LimitPlan,
    child: BoxedExecutor<'p>,
    emitted: usize,
    initialized: bool,
}

impl<'p> LimitExecutor<'p> {
    pub fn new(plan: &'p LimitPlan, child: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            child,
            emitted: 0,
            initialized: false,
        }
    }
}

impl Executor for LimitExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        self.child.init(ctx)?;
        self.emitted = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Limit", ctx)?;
        if self.emitted >= self.plan.limit {
            return Ok(None);
        }
        let row = self.child.next(ctx)?;
        if row.is_some() {
            self.emitted += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::codec::{ObjectId, Tuple};
    use crate::executor::test_util::Env;
    use crate::executor::{build_executor, execute};
    use crate::plan::PlanNode;
    use crate::schema::Schema;

    fn source(n: usize) -> PlanNode {
        let rows = (0..n)
            .map(|i| (Tuple::from_values(&[i.to_string()]), ObjectId::new()))
            .collect();
        PlanNode::middle(Arc::new(Schema::of_strings("ns", "t", &["n"])), rows)
    }

    #[test]
    fn test_limit_stops_early() {
        let plan = PlanNode::limit(2, source(5));
        let mut exec = build_executor(&plan).unwrap();
        let rows = execute(exec.as_mut(), &Env::new().session(1)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].0.value_at(0), Some(b"1".as_slice()));
    }

    #[test]
    fn test_limit_above_input() {
        let plan = PlanNode::limit(10, source(3));
        let mut exec = build_executor(&plan).unwrap();
        assert_eq!(execute(exec.as_mut(), &Env::new().session(1)).unwrap().len(), 3);
    }

    #[test]
    fn test_limit_zero() {
        let plan = PlanNode::limit(0, source(3));
        let mut exec = build_executor(&plan).unwrap();
        assert!(execute(exec.as_mut(), &Env::new().session(1)).unwrap().is_empty());
    }
}
