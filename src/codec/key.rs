//! Key codec for the ordered KV store.
//!
//! # Layout
//! ```text
//! Row key:          'r' | table id (u64 BE) | row id (16 B)
//! Index prefix:     'i' | index id (u64 BE)
//! Primary entry:    key = prefix | columns            value = row key
//! Secondary entry:  key = prefix | columns | row id   value = (empty)
//! ```
//!
//! Every indexed column is written followed by a single `0x00`, so a prefix
//! built from the leading columns of an index matches exactly those
//! columns. Ordering is byte-lexicographic throughout.

use crate::codec::object_id::{ObjectId, OBJECT_ID_LEN};
use crate::common::{Error, Result};

pub const ROW_KEY_PREFIX: u8 = b'r';
pub const INDEX_KEY_PREFIX: u8 = b'i';

/// Encoded width of a row key.
pub const ROW_KEY_LEN: usize = 1 + 8 + OBJECT_ID_LEN;

const ID_END: usize = 9;

/// Row key of `row_id` in table `table_id`.
pub fn row_key(table_id: u64, row_id: &ObjectId) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROW_KEY_LEN);
    key.push(ROW_KEY_PREFIX);
    key.extend_from_slice(&table_id.to_be_bytes());
    key.extend_from_slice(row_id.as_bytes());
    key
}

/// Split a row key into its table id and row id.
pub fn parse_row_key(key: &[u8]) -> Result<(u64, ObjectId)> {
    if key.len() != ROW_KEY_LEN || key[0] != ROW_KEY_PREFIX {
        return Err(Error::Corrupted(format!(
            "not a row key: {} bytes, prefix {:?}",
            key.len(),
            key.first()
        )));
    }
    let table_id = read_id(&key[1..ID_END]);
    let row_id = ObjectId::from_slice(&key[ID_END..])?;
    Ok((table_id, row_id))
}

/// Smallest key of table `table_id`'s rows.
pub fn tuple_record_begin(table_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_END);
    key.push(ROW_KEY_PREFIX);
    key.extend_from_slice(&table_id.to_be_bytes());
    key
}

/// First key past table `table_id`'s rows.
pub fn tuple_record_end(table_id: u64) -> Vec<u8> {
    match table_id.checked_add(1) {
        Some(next) => tuple_record_begin(next),
        None => vec![ROW_KEY_PREFIX + 1],
    }
}

/// `'i' | index id`.
pub fn index_prefix(index_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_END);
    key.push(INDEX_KEY_PREFIX);
    key.extend_from_slice(&index_id.to_be_bytes());
    key
}

/// Index prefix followed by the given leading columns.
pub fn index_key_prefix<V: AsRef<[u8]>>(index_id: u64, columns: &[V]) -> Vec<u8> {
    let mut key = index_prefix(index_id);
    encode_columns(&mut key, columns);
    key
}

fn encode_columns<V: AsRef<[u8]>>(buf: &mut Vec<u8>, columns: &[V]) {
    for column in columns {
        buf.extend_from_slice(column.as_ref());
        buf.push(0);
    }
}

/// A key/value pair to write into the KV store for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Primary index entry: the value is the row key.
pub fn primary_index_entry<V: AsRef<[u8]>>(
    index_id: u64,
    columns: &[V],
    table_id: u64,
    row_id: &ObjectId,
) -> IndexEntry {
    IndexEntry {
        key: index_key_prefix(index_id, columns),
        value: row_key(table_id, row_id),
    }
}

/// Secondary index entry: the row id is the key's suffix, the value is
/// empty.
pub fn secondary_index_entry<V: AsRef<[u8]>>(
    index_id: u64,
    columns: &[V],
    row_id: &ObjectId,
) -> IndexEntry {
    let mut key = index_key_prefix(index_id, columns);
    key.extend_from_slice(row_id.as_bytes());
    IndexEntry {
        key,
        value: Vec::new(),
    }
}

/// Row id of a secondary index key.
pub fn row_id_from_secondary_key(key: &[u8]) -> Result<ObjectId> {
    if key.len() < ID_END + OBJECT_ID_LEN || key[0] != INDEX_KEY_PREFIX {
        return Err(Error::Corrupted(format!(
            "not a secondary index key: {} bytes",
            key.len()
        )));
    }
    ObjectId::from_slice(&key[key.len() - OBJECT_ID_LEN..])
}

/// Row id of a primary index entry, read from its value.
pub fn row_id_from_primary_value(value: &[u8]) -> Result<ObjectId> {
    parse_row_key(value).map(|(_, row_id)| row_id)
}

/// Index id of an index key.
pub fn index_id_of(key: &[u8]) -> Result<u64> {
    if key.len() < ID_END || key[0] != INDEX_KEY_PREFIX {
        return Err(Error::Corrupted("not an index key".into()));
    }
    Ok(read_id(&key[1..ID_END]))
}

fn read_id(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}
