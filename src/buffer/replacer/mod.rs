//! Eviction policy implementations (replacers).
//!
//! A replacer tracks the frames that are resident but *unpinned* and picks
//! the next one to demote. Currently implements:
//! - [`LruReplacer`] - Least Recently Unpinned

mod lru;

pub use lru::LruReplacer;

use crate::common::{FrameId, Result};

/// Victim selection policy of a buffer pool partition.
pub trait Replacer: Send + Sync {
    /// Start tracking a frame whose pin count dropped to zero.
    ///
    /// # Errors
    /// `Error::ExceedMaxCap` if the replacer is already full.
    fn unpin(&self, frame_id: FrameId) -> Result<()>;

    /// Stop tracking a frame that was pinned again (or removed).
    fn pin(&self, frame_id: FrameId);

    /// Remove and return the next frame to evict, or `None` if empty.
    fn victim(&self) -> Option<FrameId>;

    /// Number of tracked frames.
    fn size(&self) -> usize;
}
