//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between the executors and
//! disk. It manages a fixed arena of frames, each holding one page, split
//! into partitions that own disjoint stripes of the PID space.
//!
//! # Components
//! - [`BufferPool`] - The hybrid page cache
//! - [`BufferFrame`] / [`FrameState`] - Per-frame metadata and lifecycle
//! - [`Swip`] - Tagged hot / cool / evicted page reference
//! - [`FreeList`] - Lock-free stack of free frames
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy (LRU)

mod arena;
mod buffer_pool;
mod cooling;
mod frame;
mod free_list;
mod page_guard;
mod partition;
pub mod replacer;
mod stats;
mod swip;

pub use buffer_pool::BufferPool;
pub use frame::{BufferFrame, FrameState};
pub use free_list::FreeList;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
pub use swip::Swip;
