//! Table schemas and typed values.
//!
//! - [`Schema`] / [`Field`] - Positional field list with persisted encoding
//! - [`FieldType`] / [`Value`] - BSON-tagged field types and decoded values
//! - [`merge_schema`] / [`merge_modifier`] - Join-side schema and tuple merge

mod table_schema;
mod value;

pub use table_schema::{
    encode_key, merge_modifier, merge_schema, Field, Schema, ATTR_NULLABLE, ATTR_PRIMARY,
};
pub use value::{FieldType, Value};
