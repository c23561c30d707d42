//! Cooperative cancellation for executor pipelines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::error::{Error, Result};

/// Shared flag checked by executors between tuples.
///
/// Clones observe the same flag, so a caller can keep one handle and cancel a
/// pipeline that runs on another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Error::Cancelled` once [`cancel`](Self::cancel) has been called.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
