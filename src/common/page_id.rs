//! Page identifier type.

use std::fmt;

/// Identifies a page on disk.
///
/// A 64-bit PID, stable over the lifetime of a database file. Two values are
/// reserved: `0` (never handed out by an allocator) and `2^63`, the invalid
/// marker. Swips store a PID shifted left by two bits, so usable PIDs stay
/// below `2^62`.
///
/// # Example
/// ```
/// use policydb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    /// Invalid/sentinel page ID.
    pub const INVALID: PageId = PageId(1 << 63);

    /// The reserved zero PID.
    pub const RESERVED: PageId = PageId(0);

    /// Largest PID a swip can encode.
    pub const MAX: PageId = PageId((1 << 62) - 1);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u64) -> Self {
        PageId(id)
    }

    /// Check if this page ID is usable (neither reserved nor the sentinel).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID && *self != Self::RESERVED && self.0 <= Self::MAX.0
    }

    /// Byte offset of this page within the database file.
    #[inline]
    pub fn file_offset(&self, page_size: usize) -> u64 {
        self.0 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
