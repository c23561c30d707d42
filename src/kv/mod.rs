//! Ordered key/value engine contract.
//!
//! Executors and the session talk to the row store only through these
//! traits. Any multi-version engine with snapshot reads and
//! managed commit timestamps fits; [`MemKv`] is the in-process one.
//!
//! # Components
//! - [`KvStore`] - Opens transactions at a read timestamp
//! - [`KvTransaction`] - Snapshot reads, buffered writes, commit/discard
//! - [`KvIterator`] / [`KvItem`] - Ordered cursor over a snapshot
//! - [`IteratorOptions`] - Cursor direction, prefix and version filters

mod mem;

use std::sync::Arc;

use crate::common::Result;

pub use mem::MemKv;

/// Keys under this prefix are engine-internal and hidden from iterators
/// unless [`IteratorOptions::internal_access`] is set.
pub const INTERNAL_KEY_PREFIX: &[u8] = b"!policydb!";

/// Options for [`KvTransaction::new_iterator`].
#[derive(Debug, Clone)]
pub struct IteratorOptions {
    /// Number of items to fetch ahead of the cursor.
    pub prefetch_size: usize,
    /// Whether prefetching also loads values.
    pub prefetch_values: bool,
    /// Iterate in descending key order.
    pub reverse: bool,
    /// Yield every version up to the read timestamp, tombstones included.
    pub all_versions: bool,
    /// Include engine-internal keys.
    pub internal_access: bool,
    /// Restrict the cursor to keys starting with this prefix.
    pub prefix: Vec<u8>,
    /// Only yield versions committed after this timestamp.
    pub since_ts: u64,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            prefetch_size: 100,
            prefetch_values: true,
            reverse: false,
            all_versions: false,
            internal_access: false,
            prefix: Vec::new(),
            since_ts: 0,
        }
    }
}

impl IteratorOptions {
    pub fn with_prefix(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }
}

/// One entry under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvItem {
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
    pub(crate) version: u64,
    pub(crate) deleted: bool,
}

impl KvItem {
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn key_copy(&self) -> Vec<u8> {
        self.key.clone()
    }

    pub fn value_copy(&self) -> Vec<u8> {
        self.value.clone()
    }

    /// Commit timestamp of this version; pending writes report the
    /// transaction's read timestamp.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Only ever true when iterating with `all_versions`.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// Cursor over a transaction snapshot.
///
/// The cursor starts before the first item; call [`seek`](Self::seek) or
/// [`rewind`](Self::rewind) before reading.
pub trait KvIterator: Send {
    /// Position at the first key `>= key` (`<= key` when reversed).
    fn seek(&mut self, key: &[u8]);
    fn rewind(&mut self);
    fn next(&mut self);
    fn valid(&self) -> bool;
    fn valid_for_prefix(&self, prefix: &[u8]) -> bool;
    /// The current item, `None` when the cursor is not valid.
    fn item(&self) -> Option<&KvItem>;
    fn close(&mut self);
}

/// Snapshot transaction over the store.
///
/// Methods take `&self` so a transaction can be shared between the
/// executors of one pipeline; implementations serialize internally.
pub trait KvTransaction: Send + Sync {
    fn read_ts(&self) -> u64;

    /// Returns `Error::KeyNotFound` if `key` has no visible value.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Returns `Error::KeyNotFound` if `key` has no visible value.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Commit at a timestamp chosen by the store.
    fn commit(&self) -> Result<()>;

    /// Commit at a caller-managed timestamp.
    fn commit_at(&self, commit_ts: u64) -> Result<()>;

    /// Commit at `commit_ts`, then hand the outcome to `callback` and
    /// return whatever it returns.
    fn commit_with(
        &self,
        commit_ts: u64,
        callback: &mut dyn FnMut(Result<()>) -> Result<()>,
    ) -> Result<()> {
        let outcome = self.commit_at(commit_ts);
        callback(outcome)
    }

    /// Drop pending writes. Idempotent; a no-op after commit.
    fn discard(&self);

    fn new_iterator(&self, opts: IteratorOptions) -> Result<Box<dyn KvIterator>>;

    /// Cursor over the versions of a single key.
    fn new_key_iterator(&self, key: &[u8], opts: IteratorOptions) -> Result<Box<dyn KvIterator>>;
}

/// Opens transactions.
pub trait KvStore: Send + Sync {
    /// Managed mode: read at `read_ts`.
    fn new_transaction_at(&self, read_ts: u64, update: bool) -> Arc<dyn KvTransaction>;

    /// Read at the latest committed timestamp.
    fn new_transaction(&self, update: bool) -> Arc<dyn KvTransaction>;
}
