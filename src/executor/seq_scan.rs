//! Sequential table scan.

use crate::codec::key::{parse_row_key, tuple_record_begin};
use crate::codec::Tuple;
use crate::common::{Error, Result};
use crate::executor::{ready, Executor, Row};
use crate::kv::{IteratorOptions, KvIterator};
use crate::plan::SeqScanPlan;
use crate::schema::{Schema, Value};
use crate::session::SessionContext;

/// Full scan of one table's row keys, optionally filtered by a predicate.
pub struct SeqScanExecutor<'p> {
    plan: &'p SeqScanPlan,
    prefix: Vec<u8>,
    iter: Option<Box<dyn KvIterator>>,
}

impl<'p> SeqScanExecutor<'p> {
    pub fn new(plan: &'p SeqScanPlan) -> Self {
        Self {
            plan,
            prefix: tuple_record_begin(plan.table_id),
            iter: None,
        }
    }

    fn matches(&self, tuple: &Tuple) -> Result<bool> {
        let Some(predicate) = &self.plan.predicate else {
            return Ok(true);
        };
        match predicate.evaluate(tuple, &self.plan.schema)? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::ExpectedBooleanType(other.type_name().to_string())),
        }
    }
}

impl Executor for SeqScanExecutor<'_> {
    fn schema(&self) -> &Schema {
        &self.plan.schema
    }

    fn init(&mut self, ctx: &SessionContext) -> Result<()> {
        let mut iter = ctx
            .txn()
            .new_iterator(IteratorOptions::with_prefix(self.prefix.clone()))?;
        iter.seek(&self.prefix);
        self.iter = Some(iter);
        Ok(())
    }

    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>> {
        loop {
            ready(self.iter.is_some(), "SeqScan", ctx)?;
            let Some(iter) = self.iter.as_mut() else {
                return Err(Error::NotInitialized("SeqScan"));
            };
            if !iter.valid_for_prefix(&self.prefix) {
                return Ok(None);
            }
            let Some(item) = iter.item() else {
                return Ok(None);
            };
            let (_, row_id) = parse_row_key(item.key())?;
            let tuple = Tuple::from_bytes(item.value_copy())?;
            iter.next();

            if self.matches(&tuple)? {
                return Ok(Some((tuple, row_id)));
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut iter) = self.iter.take() {
            iter.close();
        }
        Ok(())
    }
}
