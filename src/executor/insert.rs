//! Row insertion with index maintenance.

use crate::codec::key::row_key;
use crate::codec::{ObjectId, Tuple};
use crate::common::Result;
use crate::executor::{ready, BoxedExecutor, Executor, Row};
use crate::plan::InsertPlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Writes one row, and its index entries, per `next`.
///
/// Rows come from the child when there is one, otherwise from the plan's
/// raw values. Each row is stored under a freshly minted object id and
/// yielded back so callers can see what was written.
pub struct InsertExecutor<'p> {
    plan: &'p InsertPlan,
    child: Option<BoxedExecutor<'p>>,
    cursor: usize,
    initialized: bool,
}

impl<'p> InsertExecutor<'p> {
    pub fn new(plan: &'p InsertPlan, child: Option<BoxedExecutor<'p>>) -> Self {
        Self {
            plan,
            child,
            cursor: 0,
            initialized: false,
        }
    }

    fn next_source(&mut self, ctx: &SessionContext) -> Result<Option<Tuple>> {
        if let Some(child) = self.child.as_mut() {
            return Ok(child.next(ctx)?.map(|(tuple, _)| tuple));
        }
        if self.cursor == self.plan.raw_values.len() {
            return Ok(None);
        }
        let tuple = self.plan.raw_values[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(tuple))
    }
}

impl Executor for InsertExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        if let Some(child) = self.child.as_mut() {
            child.init(ctx)?;
        }
        self.cursor = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Insert", ctx)?;
        let Some(tuple) = self.next_source(ctx)? else {
            return Ok(None);
        };

        let table = &self.plan.table;
        let row_id = ObjectId::new();
        let txn = ctx.txn();
        txn.set(&row_key(table.id, &row_id), tuple.as_bytes())?;
        for entry in table.index_entries(&tuple, &row_id)? {
            txn.set(&entry.key, &entry.value)?;
        }
        Ok(Some((tuple, row_id)))
    }

    fn close(&mut self) -> Result<()> {
        match self.child.as_mut() {
            Some(child) => child.close(),
            None => Ok(()),
        }
    }
}
