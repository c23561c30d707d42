//! Plan to executor translation.

use tracing::debug;

use crate::common::{Error, Result};
use crate::executor::{
    BoxedExecutor, ConstExecutor, DeleteExecutor, IndexScanExecutor, InsertExecutor,
    LimitExecutor, MatcherExecutor, MiddleExecutor, MultiIndexScanExecutor, SchemaExecutor,
    SeqScanExecutor, ShortCircuitExecutor, TableRowIdScanExecutor, UpdateExecutor,
};
use crate::plan::PlanNode;

/// Walks a plan tree and builds the matching executor tree.
///
/// The first error is kept; once one is recorded every later `build`
/// returns `None` until [`take_error`](Self::take_error) clears it.
#[derive(Debug, Default)]
pub struct ExecutorBuilder {
    err: Option<Error>,
}

impl ExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'p>(&mut self, plan: &'p PlanNode) -> Option<BoxedExecutor<'p>> {
        if self.err.is_some() {
            return None;
        }
        match Self::visit(plan) {
            Ok(executor) => Some(executor),
            Err(e) => {
                debug!(plan = plan.kind(), error = %e, "executor build failed");
                self.err = Some(e);
                None
            }
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.err.take()
    }

    fn visit(plan: &PlanNode) -> Result<BoxedExecutor<'_>> {
        let children = plan.children();
        if children.len() < plan.required_children() {
            return Err(Error::MissChildPlan(plan.kind()));
        }

        let executor: BoxedExecutor<'_> = match plan {
            PlanNode::SeqScan(p) => Box::new(SeqScanExecutor::new(p)),
            PlanNode::IndexScan(p) => Box::new(IndexScanExecutor::new(p)),
            PlanNode::Const(p) => Box::new(ConstExecutor::new(p)),
            PlanNode::Middle(p) => Box::new(MiddleExecutor::new(p)),
            PlanNode::Schema(p) => Box::new(SchemaExecutor::new(p)),
            PlanNode::Insert(p) => {
                let child = match children.first() {
                    Some(child) => Some(Self::visit(child)?),
                    None => None,
                };
                Box::new(InsertExecutor::new(p, child))
            }
            PlanNode::Update(p) => Box::new(UpdateExecutor::new(p, Self::visit(&children[0])?)),
            PlanNode::Delete(p) => Box::new(DeleteExecutor::new(p, Self::visit(&children[0])?)),
            PlanNode::TableRowIdScan(p) => {
                Box::new(TableRowIdScanExecutor::new(p, Self::visit(&children[0])?))
            }
            PlanNode::Limit(p) => Box::new(LimitExecutor::new(p, Self::visit(&children[0])?)),
            PlanNode::Matcher(p) => Box::new(MatcherExecutor::new(p, Self::visit(&children[0])?)),
            PlanNode::ShortCircuit(p) => {
                Box::new(ShortCircuitExecutor::new(p, Self::visit(&children[0])?))
            }
            PlanNode::MultiIndexScan(p) => Box::new(MultiIndexScanExecutor::new(
                p,
                Self::visit(&children[0])?,
                Self::visit(&children[1])?,
            )),
        };
        Ok(executor)
    }
}

/// Build `plan` in one go, returning the first error.
pub fn build_executor(plan: &PlanNode) -> Result<BoxedExecutor<'_>> {
    let mut builder = ExecutorBuilder::new();
    match builder.build(plan) {
        Some(executor) => Ok(executor),
        None => Err(builder
            .take_error()
            .unwrap_or(Error::MissChildPlan(plan.kind()))),
    }
}
