//! Error types for policydb.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in policydb.
///
/// Errors are values: nothing in the storage or execution path panics on a
/// recoverable condition.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Free list empty and no evictable frame in any partition.
    #[error("No available page in buffer pool")]
    NoAvailablePage,

    /// Delete or reclaim of a page that is still pinned.
    #[error("Page {0} is still pinned")]
    PagePinned(PageId),

    /// Replacer asked to track more frames than it was sized for.
    #[error("Replacer exceeds max capacity {0}")]
    ExceedMaxCap(usize),

    /// Read of a page that lies (partly) beyond the end of the file.
    #[error("Read of {pid} exceeds file size {file_size}")]
    IoReadExceedFileSize { pid: PageId, file_size: u64 },

    /// Page or tuple buffer is too small for the value.
    #[error("Out of space: need {needed} bytes, {available} available")]
    OutOfSpace { needed: usize, available: usize },

    /// Slotted insert of an empty value.
    #[error("Cannot store zero-size data")]
    ZeroSizeData,

    /// KV get/delete of a missing key.
    #[error("Key not found")]
    KeyNotFound,

    /// Builder reached a plan node without its required children.
    #[error("Plan node {0} is missing a child plan")]
    MissChildPlan(&'static str),

    /// Predicate did not evaluate to a boolean primitive.
    #[error("Unknown evaluation result: {0}")]
    UnknownEvaluationResult(String),

    /// Scan predicate produced a non-boolean value.
    #[error("Expected boolean type, got {0}")]
    ExpectedBooleanType(String),

    /// Page id is reserved, the invalid marker, or out of range.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    /// Byte layout failed to decode (bad checksum, truncated tuple, ...).
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Value cannot be represented in the requested encoding.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Invalid runtime configuration.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Another transaction committed a newer version of a written key.
    #[error("Transaction conflict on commit")]
    Conflict,

    /// Write attempted through a read-only transaction.
    #[error("Transaction is read-only")]
    ReadOnlyTxn,

    /// Transaction was already committed or discarded.
    #[error("Transaction has been discarded")]
    TxnDiscarded,

    #[error("Database {0} already exists")]
    DatabaseExists(String),

    #[error("Database {0} not found")]
    DatabaseNotFound(String),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Schema for {0} not found")]
    SchemaNotFound(String),

    /// Executor pipeline was cancelled through its token.
    #[error("Execution cancelled")]
    Cancelled,

    /// `next` called before `init`.
    #[error("Executor {0} used before init")]
    NotInitialized(&'static str),

    /// KV commit succeeded but the catalog or schema commit did not.
    #[error("Catalog diverged after commit at ts {commit_ts}: {reason}")]
    CatalogDiverged { commit_ts: u64, reason: String },

    /// Sketch merge with different dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
}

impl Error {
    /// True for the KV engine's not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PagePinned(PageId::new(42));
        assert_eq!(format!("{}", err), "Page Page(42) is still pinned");

        let err = Error::NoAvailablePage;
        assert_eq!(format!("{}", err), "No available page in buffer pool");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::KeyNotFound.is_not_found());
        assert!(!Error::Conflict.is_not_found());
    }
}
