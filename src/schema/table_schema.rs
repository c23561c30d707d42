//! Table schemas.
//!
//! # Persisted layout
//! ```text
//! key:   namespace | 0x00 | table | 0x00
//! value: ( type byte | field name | 0x00 )*
//! ```
//!
//! Field attributes are runtime-only and are not written to the schema
//! store.

use std::collections::HashSet;

use crate::codec::Tuple;
use crate::common::{Error, Result};
use crate::schema::value::{FieldType, Value};

/// Field may hold an empty value.
pub const ATTR_NULLABLE: u32 = 1;
/// Field is part of the table's primary key.
pub const ATTR_PRIMARY: u32 = 1 << 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub attributes: u32,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            attributes: 0,
        }
    }

    pub fn with_attributes(mut self, attributes: u32) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn has_attribute(&self, attr: u32) -> bool {
        self.attributes & attr != 0
    }
}

/// Ordered field list of a table, positional with the table's tuples.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    namespace: String,
    table: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(namespace: impl Into<String>, table: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            namespace: namespace.into(),
            table: table.into(),
            fields,
        }
    }

    /// Schema of `table` whose fields are all strings.
    pub fn of_strings(namespace: &str, table: &str, names: &[&str]) -> Self {
        let fields = names
            .iter()
            .map(|name| Field::new(*name, FieldType::String))
            .collect();
        Self::new(namespace, table, fields)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Decode element `index` of `tuple` according to this schema.
    pub fn value_of(&self, tuple: &Tuple, index: usize) -> Result<Value> {
        let field = self.fields.get(index).ok_or_else(|| {
            Error::InvalidValue(format!("column {} out of range for {}", index, self.table))
        })?;
        let bytes = tuple.value_at(index).ok_or_else(|| {
            Error::Corrupted(format!("tuple has no element {} ({})", index, field.name))
        })?;
        if bytes.is_empty() && field.has_attribute(ATTR_NULLABLE) {
            return Ok(Value::Null);
        }
        Value::from_bytes(field.field_type, bytes)
    }

    pub fn encode_key(&self) -> Vec<u8> {
        encode_key(&self.namespace, &self.table)
    }

    pub fn encode_value(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for field in &self.fields {
            buf.push(field.field_type as u8);
            buf.extend_from_slice(field.name.as_bytes());
            buf.push(0);
        }
        buf
    }

    /// Rebuild a schema from its persisted key and value.
    pub fn decode(key: &[u8], value: &[u8]) -> Result<Self> {
        let mut parts = key.split(|b| *b == 0);
        let namespace = utf8(parts.next(), "namespace")?;
        let table = utf8(parts.next(), "table")?;
        if key.last() != Some(&0) {
            return Err(Error::Corrupted("schema key is not terminated".into()));
        }

        let mut fields = Vec::new();
        let mut rest = value;
        while let Some((&type_byte, tail)) = rest.split_first() {
            let end = tail
                .iter()
                .position(|b| *b == 0)
                .ok_or_else(|| Error::Corrupted("unterminated field name".into()))?;
            let name = utf8(Some(&tail[..end]), "field name")?;
            fields.push(Field::new(name, FieldType::from_u8(type_byte)?));
            rest = &tail[end + 1..];
        }
        Ok(Self::new(namespace, table, fields))
    }

    /// Clone of `self` with the fields of `other` it lacks appended.
    pub fn merge(&self, other: &Schema) -> Schema {
        merge_schema(self, other)
    }
}

fn utf8(part: Option<&[u8]>, what: &str) -> Result<String> {
    let part = part.ok_or_else(|| Error::Corrupted(format!("schema {} missing", what)))?;
    String::from_utf8(part.to_vec())
        .map_err(|_| Error::Corrupted(format!("schema {} is not utf-8", what)))
}

/// `namespace | 0x00 | table | 0x00`.
pub fn encode_key(namespace: &str, table: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(namespace.len() + table.len() + 2);
    key.extend_from_slice(namespace.as_bytes());
    key.push(0);
    key.extend_from_slice(table.as_bytes());
    key.push(0);
    key
}

/// Left schema followed by the right-only fields, matched by name.
pub fn merge_schema(left: &Schema, right: &Schema) -> Schema {
    let seen: HashSet<&str> = left.fields.iter().map(|f| f.name.as_str()).collect();
    let mut merged = left.clone();
    merged.fields.extend(
        right
            .fields
            .iter()
            .filter(|f| !seen.contains(f.name.as_str()))
            .cloned(),
    );
    merged
}

/// Combine two tuples into one laid out by `merge_schema(s1, s2)`.
///
/// Fields present in both schemas take their value from `t1`.
pub fn merge_modifier(t1: &Tuple, s1: &Schema, t2: &Tuple, s2: &Schema) -> Result<Tuple> {
    let merged = merge_schema(s1, s2);
    let mut values: Vec<&[u8]> = Vec::with_capacity(merged.len());
    for field in merged.fields() {
        let value = match s1.index_of(&field.name) {
            Some(i) => t1.value_at(i),
            None => s2.index_of(&field.name).and_then(|i| t2.value_at(i)),
        };
        let value = value.ok_or_else(|| {
            Error::Corrupted(format!("tuple is missing field {}", field.name))
        })?;
        values.push(value);
    }
    Ok(Tuple::from_values(&values))
}
