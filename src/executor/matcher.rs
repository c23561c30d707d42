//! Policy-effect folding.
//!
//! A matcher drains its child (or as much of it as the effect needs) and
//! yields a single boolean tuple: `[1]` to allow, `[0]` to deny. No rows
//! denies, except under deny-override where only a deny row denies.

use crate::codec::{ObjectId, Tuple};
use crate::common::{Error, Result};
use crate::executor::{ready, BoxedExecutor, Executor, Row};
use crate::plan::{EffectType, MatcherPlan};
use crate::schema::{Schema, Value};
use crate::session::SessionContext;

pub const EFFECT_ALLOW: &[u8] = b"allow";
pub const EFFECT_DENY: &[u8] = b"deny";

pub struct MatcherExecutor<'p> {
    plan: &'p MatcherPlan,
    child: BoxedExecutor<'p>,
    done: bool,
    initialized: bool,
}

impl<'p> MatcherExecutor<'p> {
    pub fn new(plan: &'p MatcherPlan, child: BoxedExecutor<'p>) -> Self {
        Self {
            plan,
            child,
            done: false,
            initialized: false,
        }
    }

    /// `true` for allow, `false` for deny.
    fn effect_of(&self, tuple: &Tuple) -> Result<bool> {
        let column = self.plan.effect_column;
        match tuple.value_at(column) {
            Some(EFFECT_ALLOW) => Ok(true),
            Some(EFFECT_DENY) => Ok(false),
            Some(other) => Err(Error::InvalidValue(format!(
                "unknown effect {:?}",
                String::from_utf8_lossy(other)
            ))),
            None => Err(Error::Corrupted(format!("row has no effect column {}", column))),
        }
    }

    fn priority_of(&self, tuple: &Tuple, column: usize) -> Result<i64> {
        match self.child.schema().value_of(tuple, column)? {
            Value::Int64(p) => Ok(p),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::InvalidValue(format!("priority {:?} is not an integer", s))),
            other => Err(Error::InvalidValue(format!(
                "priority column holds {}",
                other.type_name()
            ))),
        }
    }

    fn pull(&mut self, ctx: &SessionContext) -> Result<Option<Tuple>> {
        ctx.cancel_token().check()?;
        Ok(self.child.next(ctx)?.map(|(tuple, _)| tuple))
    }

    fn decide(&mut self, ctx: &SessionContext) -> Result<bool> {
        match self.plan.effect {
            EffectType::AllowOverride => Ok(self.pull(ctx)?.is_some()),
            EffectType::DenyOverride => {
                while let Some(tuple) = self.pull(ctx)? {
                    if !self.effect_of(&tuple)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            EffectType::AllowAndDeny => {
                let mut matched = false;
                while let Some(tuple) = self.pull(ctx)? {
                    if !self.effect_of(&tuple)? {
                        return Ok(false);
                    }
                    matched = true;
                }
                Ok(matched)
            }
            EffectType::Priority => match self.pull(ctx)? {
                Some(tuple) => self.effect_of(&tuple),
                None => Ok(false),
            },
            EffectType::PriorityBaseOnRole => {
                let column = self.plan.priority_column.ok_or_else(|| {
                    Error::InvalidValue("priority matcher needs a priority column".into())
                })?;
                let mut best: Option<(i64, bool)> = None;
                while let Some(tuple) = self.pull(ctx)? {
                    let priority = self.priority_of(&tuple, column)?;
                    // Ties keep the earlier row.
                    if best.map_or(true, |(p, _)| priority < p) {
                        best = Some((priority, self.effect_of(&tuple)?));
                    }
                }
                Ok(best.is_some_and(|(_, allow)| allow))
            }
        }
    }
}

impl Executor for MatcherExecutor<'_> {
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
        ready(self.initialized, "Matcher", ctx)?;
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let allow = self.decide(ctx)?;
        Ok(Some((Tuple::from_bool(allow), ObjectId::EMPTY)))
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::test_util::Env;
    use crate::executor::{build_executor, execute};
    use crate::plan::PlanNode;

    fn rows(effects: &[(&str, &str)]) -> PlanNode {
        let schema = Arc::new(Schema::of_strings("ns", "p", &["eft", "priority"]));
        let rows = effects
            .iter()
            .map(|(eft, prio)| (Tuple::from_values(&[*eft, *prio]), ObjectId::new()))
            .collect();
        PlanNode::middle(schema, rows)
    }

    fn decide(effect: EffectType, effects: &[(&str, &str)]) -> bool {
        let mut plan = PlanNode::matcher(effect, 0, rows(effects));
        if let PlanNode::Matcher(m) = &mut plan {
            m.priority_column = Some(1);
        }
        let mut exec = build_executor(&plan).unwrap();
        let out = execute(exec.as_mut(), &Env::new().session(1)).unwrap();
        assert_eq!(out.len(), 1);
        out[0].0.as_bool().unwrap()
    }

    #[test]
    fn test_allow_override() {
        assert!(decide(EffectType::AllowOverride, &[("deny", "0")]));
        assert!(!decide(EffectType::AllowOverride, &[]));
    }

    #[test]
    fn test_deny_override() {
        assert!(decide(EffectType::DenyOverride, &[("allow", "0"), ("allow", "1")]));
        assert!(!decide(EffectType::DenyOverride, &[("allow", "0"), ("deny", "1")]));
    }

    #[test]
    fn test_deny_override_without_rows_allows() {
        assert!(decide(EffectType::DenyOverride, &[]));
    }

    #[test]
    fn test_allow_and_deny() {
        assert!(decide(EffectType::AllowAndDeny, &[("allow", "0")]));
        assert!(!decide(EffectType::AllowAndDeny, &[("allow", "0"), ("deny", "0")]));
        assert!(!decide(EffectType::AllowAndDeny, &[]));
    }

    #[test]
    fn test_priority_takes_first_row() {
        assert!(!decide(EffectType::Priority, &[("deny", "9"), ("allow", "0")]));
        assert!(decide(EffectType::Priority, &[("allow", "9"), ("deny", "0")]));
    }

    #[test]
    fn test_priority_base_on_role() {
        assert!(decide(
            EffectType::PriorityBaseOnRole,
            &[("deny", "9"), ("allow", "1"), ("deny", "1")]
        ));
        assert!(!decide(EffectType::PriorityBaseOnRole, &[]));
    }

    #[test]
    fn test_unknown_effect() {
        let plan = PlanNode::matcher(EffectType::Priority, 0, rows(&[("maybe", "0")]));
        let mut exec = build_executor(&plan).unwrap();
        let err = execute(exec.as_mut(), &Env::new().session(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }
}
