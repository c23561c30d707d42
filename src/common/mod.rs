//! Common types and utilities shared across policydb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and the buffer pool configuration
//! - Error types
//! - Identifiers (PageId, FrameId)
//! - Cancellation token threaded through executors

pub mod cancel;
pub mod config;
pub mod error;
mod frame_id;
mod page_id;

pub use cancel::CancelToken;
pub use config::BufferPoolConfig;
pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::PageId;
