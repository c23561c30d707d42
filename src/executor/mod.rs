//! Volcano-style executors.
//!
//! Each executor pulls `(tuple, row id)` pairs from its children one at a
//! time. The session context is passed to every call instead of being
//! stored, so an executor tree borrows only its plan.
//!
//! ```text
//! init(ctx) ─► next(ctx) ─► next(ctx) ─► ... ─► Ok(None) ─► close()
//! ```
//!
//! Writers (insert, update, delete) perform their writes through the
//! session's KV transaction; update and delete drain their child on the
//! first `next` and never yield.

mod builder;
mod constant;
mod ddl;
mod delete;
mod index_scan;
mod insert;
mod limit;
mod matcher;
mod middle;
mod multi_index_scan;
mod row_id_scan;
mod seq_scan;
mod short_circuit;
mod update;

use crate::codec::{ObjectId, Tuple};
use crate::common::{Error, Result};
use crate::schema::Schema;
use crate::session::SessionContext;

pub use builder::{build_executor, ExecutorBuilder};
pub use constant::ConstExecutor;
pub use ddl::SchemaExecutor;
pub use delete::DeleteExecutor;
pub use index_scan::IndexScanExecutor;
pub use insert::InsertExecutor;
pub use limit::LimitExecutor;
pub use matcher::{MatcherExecutor, EFFECT_ALLOW, EFFECT_DENY};
pub use middle::MiddleExecutor;
pub use multi_index_scan::MultiIndexScanExecutor;
pub use row_id_scan::TableRowIdScanExecutor;
pub use seq_scan::SeqScanExecutor;
pub use short_circuit::ShortCircuitExecutor;
pub use update::UpdateExecutor;

/// One output row: the tuple and the id it is stored under.
pub type Row = (Tuple, ObjectId);

pub trait Executor {
    /// Schema of the tuples this executor yields.
    fn schema(&self) -> &Schema;

    /// Prepare for the first `next`. Call exactly once.
    fn init(&mut self, ctx: &SessionContext) -> Result<()>;

    /// The next row, or `None` once exhausted.
    fn next(&mut self, ctx: &SessionContext) -> Result<Option<Row>>;

    /// Release iterators and close children.
    fn close(&mut self) -> Result<()>;
}

/// A boxed executor borrowing its plan.
pub type BoxedExecutor<'p> = Box<dyn Executor + 'p>;

/// Run `executor` to completion and collect what it yields.
pub fn execute(executor: &mut dyn Executor, ctx: &SessionContext) -> Result<Vec<Row>> {
    executor.init(ctx)?;
    let mut rows = Vec::new();
    let outcome = loop {
        match executor.next(ctx) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = executor.close();
    outcome?;
    closed?;
    Ok(rows)
}

/// Fails with `Error::NotInitialized` until `init` has run, then checks the
/// session's cancel token.
fn ready(initialized: bool, kind: &'static str, ctx: &SessionContext) -> Result<()> {
    if !initialized {
        return Err(Error::NotInitialized(kind));
    }
    ctx.cancel_token().check()
}

/// Delete `key`, treating a missing key as already deleted.
fn delete_if_present(ctx: &SessionContext, key: &[u8]) -> Result<()> {
    match ctx.txn().delete(key) {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}
