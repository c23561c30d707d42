//! Predicate expressions.
//!
//! A small tree evaluated against one decoded row. Comparisons yield
//! booleans; logical operators require boolean operands.

use crate::codec::Tuple;
use crate::common::{Error, Result};
use crate::schema::{Schema, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Column by position in the row's schema.
    Column(usize),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn col(index: usize) -> Self {
        Expr::Column(index)
    }

    /// Column reference resolved by name; `None` if `schema` lacks it.
    pub fn col_named(schema: &Schema, name: &str) -> Option<Self> {
        schema.index_of(name).map(Expr::Column)
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn ne(self, other: Expr) -> Self {
        Expr::Ne(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Evaluate against `tuple` laid out by `schema`.
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Column(index) => schema.value_of(tuple, *index),
            Expr::Eq(l, r) => Ok(Value::Bool(l.evaluate(tuple, schema)? == r.evaluate(tuple, schema)?)),
            Expr::Ne(l, r) => Ok(Value::Bool(l.evaluate(tuple, schema)? != r.evaluate(tuple, schema)?)),
            Expr::And(l, r) => {
                if !boolean(l.evaluate(tuple, schema)?)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(boolean(r.evaluate(tuple, schema)?)?))
            }
            Expr::Or(l, r) => {
                if boolean(l.evaluate(tuple, schema)?)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(boolean(r.evaluate(tuple, schema)?)?))
            }
            Expr::Not(inner) => Ok(Value::Bool(!boolean(inner.evaluate(tuple, schema)?)?)),
        }
    }

    /// Evaluate without a row. Column references fail.
    pub fn evaluate_const(&self) -> Result<Value> {
        self.evaluate(&Tuple::default(), &Schema::default())
    }
}

fn boolean(value: Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::ExpectedBooleanType(value.type_name().to_string()))
}
