//! Schema changes: database and table creation.

use tracing::debug;

use crate::common::Result;
use crate::executor::{ready, Executor, Row};
use crate::plan::SchemaPlan;
use crate::schema::Schema;
use crate::session::SessionContext;

/// Creates a database in the catalog and stages the schema of each of its
/// tables. Runs once and never yields.
pub struct SchemaExecutor<'p> {
    plan: &'p SchemaPlan,
    done: bool,
    initialized: bool,
}

impl<'p> SchemaExecutor<'p> {
    pub fn new(plan: &'p SchemaPlan) -> Self {
        Self {
            plan,
            done: false,
            initialized: false,
        }
    }
}

impl Executor for SchemaExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, _ctx: &SessionContext) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        ready(self.initialized, "Schema", ctx)?;
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let db = ctx.catalog_txn().create_db_info(self.plan.db.clone())?;
        for table in &db.tables {
            ctx.put_schema(&table.schema(&db.name))?;
        }
        debug!(db = %db.name, id = db.id, "created database");
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
