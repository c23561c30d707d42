//! Catalog metadata records.

use crate::codec::key::{self, IndexEntry};
use crate::codec::{ObjectId, Tuple};
use crate::common::{Error, Result};
use crate::schema::{Field, FieldType, Schema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub field_type: FieldType,
    /// Position of the column inside the table's tuples.
    pub offset: usize,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, field_type: FieldType, offset: usize) -> Self {
        Self {
            name: name.into(),
            field_type,
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Zero asks the catalog to assign one.
    pub id: u64,
    pub name: String,
    /// Indexed column names, leading column first.
    pub columns: Vec<String>,
    pub primary: bool,
}

impl IndexInfo {
    pub fn secondary(id: u64, name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            id,
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            primary: false,
        }
    }

    pub fn primary(id: u64, name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            primary: true,
            ..Self::secondary(id, name, columns)
        }
    }

    /// The KV entry this index holds for `tuple` stored as `row_id`.
    pub fn entry(&self, table: &TableInfo, tuple: &Tuple, row_id: &ObjectId) -> Result<IndexEntry> {
        let mut values = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let column = table.column_by_name(name).ok_or_else(|| {
                Error::InvalidValue(format!("index {} names unknown column {}", self.name, name))
            })?;
            let value = tuple.value_at(column.offset).ok_or_else(|| {
                Error::Corrupted(format!("tuple has no column {} at {}", name, column.offset))
            })?;
            values.push(value);
        }
        Ok(if self.primary {
            key::primary_index_entry(self.id, &values, table.id, row_id)
        } else {
            key::secondary_index_entry(self.id, &values, row_id)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Zero asks the catalog to assign one.
    pub id: u64,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub indices: Vec<IndexInfo>,
}

impl TableInfo {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            columns: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Append a column at the next offset.
    pub fn with_column(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let offset = self.columns.len();
        self.columns.push(ColumnInfo::new(name, field_type, offset));
        self
    }

    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indices.push(index);
        self
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index_by_id(&self, id: u64) -> Option<&IndexInfo> {
        self.indices.iter().find(|i| i.id == id)
    }

    pub fn index_by_name(&self, name: &str) -> Option<&IndexInfo> {
        self.indices.iter().find(|i| i.name == name)
    }

    /// Tuple schema of this table, fields in offset order.
    pub fn schema(&self, namespace: &str) -> Schema {
        let mut columns: Vec<&ColumnInfo> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.offset);
        let fields = columns
            .into_iter()
            .map(|c| Field::new(c.name.clone(), c.field_type))
            .collect();
        Schema::new(namespace, self.name.clone(), fields)
    }

    /// Entries of every index of this table for one row.
    pub fn index_entries(&self, tuple: &Tuple, row_id: &ObjectId) -> Result<Vec<IndexEntry>> {
        self.indices
            .iter()
            .map(|index| index.entry(self, tuple, row_id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInfo {
    /// Zero asks the catalog to assign one.
    pub id: u64,
    pub name: String,
    pub tables: Vec<TableInfo>,
}

impl DbInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableInfo) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table_by_id(&self, id: u64) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Like [`table_by_name`](Self::table_by_name), failing with
    /// `Error::TableNotFound`.
    pub fn table(&self, name: &str) -> Result<&TableInfo> {
        self.table_by_name(name)
            .ok_or_else(|| Error::TableNotFound(format!("{}.{}", self.name, name)))
    }

    /// Index `id` together with its table.
    pub fn index_by_id(&self, id: u64) -> Option<(&TableInfo, &IndexInfo)> {
        self.tables
            .iter()
            .find_map(|t| t.index_by_id(id).map(|i| (t, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_table() -> TableInfo {
        TableInfo::new(7, "policy")
            .with_column("sub", FieldType::String)
            .with_column("obj", FieldType::String)
            .with_column("act", FieldType::String)
            .with_index(IndexInfo::secondary(1, "by_sub", &["sub"]))
            .with_index(IndexInfo::primary(2, "by_sub_obj", &["sub", "obj"]))
    }

    #[test]
    fn test_lookup_helpers() {
        let db = DbInfo::new("casbin").with_table(policy_table());
        assert_eq!(db.table_by_name("policy").unwrap().id, 7);
        assert!(db.table_by_id(8).is_none());
        assert!(matches!(db.table("acl"), Err(Error::TableNotFound(_))));
        let (table, index) = db.index_by_id(2).unwrap();
        assert_eq!(table.name, "policy");
        assert!(index.primary);
    }

    #[test]
    fn test_schema_follows_offsets() {
        let schema = policy_table().schema("casbin");
        assert_eq!(schema.namespace(), "casbin");
        assert_eq!(schema.index_of("act"), Some(2));
    }

    #[test]
    fn test_index_entries() {
        let table = policy_table();
        let rid = ObjectId::new();
        let tuple = Tuple::from_values(&["bob", "data1", "read"]);

        let entries = table.index_entries(&tuple, &rid).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], key::secondary_index_entry(1, &[b"bob"], &rid));
        assert_eq!(
            entries[1],
            key::primary_index_entry(2, &[b"bob".as_slice(), b"data1"], 7, &rid)
        );
    }

    #[test]
    fn test_index_on_unknown_column() {
        let table = TableInfo::new(1, "t")
            .with_column("a", FieldType::String)
            .with_index(IndexInfo::secondary(1, "bad", &["zzz"]));
        let tuple = Tuple::from_values(&["x"]);
        assert!(table.index_entries(&tuple, &ObjectId::new()).is_err());
    }
}
