//! RAII guards for page access.
//!
//! These guards provide safe access to pages in the buffer pool:
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access; stamps a fresh GSN on drop
//!
//! Both guards release the frame latch first and then unpin the frame when
//! dropped. Derefs expose the page body (everything after the 24-byte
//! header); [`raw`](PageReadGuard::raw) exposes the whole page.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::buffer_pool::PoolInner;
use crate::common::config::PAGE_HEADER_SIZE;
use crate::common::{FrameId, PageId};
use crate::storage::page::{PageHeader, PageType};

/// Guard for read-only page access.
///
/// # Example
/// ```ignore
/// let guard = pool.fetch_page_read(page_id)?;
/// let data = guard.as_slice();
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    pool: &'a PoolInner,
    frame_id: FrameId,
    page_id: PageId,
    lock: Option<RwLockReadGuard<'a, ()>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        pool: &'a PoolInner,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, ()>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// The whole page, header included.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        // SAFETY: the shared latch is held for the guard's lifetime.
        unsafe { self.pool.arena.page(self.frame_id) }
    }

    /// The page body.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.raw()[PAGE_HEADER_SIZE..]
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(self.raw())
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.pool.unpin(self.frame_id);
        }
    }
}

/// Guard for exclusive write access to a page.
///
/// Dropping the guard assigns the page the next global sequence number,
/// which makes the frame dirty until its next writeback.
pub struct PageWriteGuard<'a> {
    pool: &'a PoolInner,
    frame_id: FrameId,
    page_id: PageId,
    lock: Option<RwLockWriteGuard<'a, ()>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        pool: &'a PoolInner,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, ()>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    #[inline]
    pub fn raw(&self) -> &[u8] {
        // SAFETY: the exclusive latch is held for the guard's lifetime.
        unsafe { self.pool.arena.page(self.frame_id) }
    }

    #[inline]
    fn raw_mut(&mut self) -> &mut [u8] {
        // SAFETY: the exclusive latch is held for the guard's lifetime and
        // `&mut self` prevents a second borrow through this guard.
        unsafe { self.pool.arena.page_mut(self.frame_id) }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.raw()[PAGE_HEADER_SIZE..]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.raw_mut()[PAGE_HEADER_SIZE..]
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(self.raw())
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        let mut header = self.header();
        header.page_type = page_type;
        header.write_to(self.raw_mut());
    }

    /// Exclude this page from cooling and eviction while resident.
    pub fn set_keep_in_memory(&mut self, keep: bool) {
        self.pool.frame(self.frame_id).set_keep_in_memory(keep);
    }

    /// Detach the latch so the pool can recycle the frame without running
    /// the normal drop path.
    pub(crate) fn take_latch(&mut self) -> Option<RwLockWriteGuard<'a, ()>> {
        self.lock.take()
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        if self.lock.is_none() {
            return;
        }
        let gsn = self.pool.next_gsn();
        PageHeader::write_gsn(self.raw_mut(), gsn);
        self.pool.frame(self.frame_id).set_page_gsn(gsn);

        drop(self.lock.take());
        self.pool.unpin(self.frame_id);
    }
}
