//! Buffer frame metadata.
//!
//! A [`BufferFrame`] holds everything the pool needs to know about one slot
//! of the frame arena:
//! - Which page is loaded and in which state
//! - Pin count for reference counting
//! - GSN of the in-memory page and of the last writeback (dirtiness)
//! - The shared/exclusive latch guarding the page bytes
//! - The intrusive next-free link used by the free list
//!
//! The page bytes themselves live in the [`FrameArena`](super::arena::FrameArena).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

use parking_lot::RwLock;

use crate::common::PageId;

/// Marker for "never written back"; a fresh page is dirty until its first
/// writeback.
pub(crate) const NEVER_WRITTEN: u64 = u64::MAX;

/// Lifecycle state of a frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// On the free list, no page.
    Free = 0,
    /// Resident and referenced by a hot swip.
    Hot = 1,
    /// Resident, in the cooling queue, referenced by a cool swip.
    Cool = 2,
    /// Being read from disk.
    Loaded = 3,
}

impl FrameState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => FrameState::Hot,
            2 => FrameState::Cool,
            3 => FrameState::Loaded,
            _ => FrameState::Free,
        }
    }
}

/// Metadata of one frame in the buffer pool.
///
/// # Thread Safety
/// All fields use interior mutability:
/// - `latch`: `RwLock` guarding the page bytes in the arena
/// - everything else: atomics, mutated under the owning partition's table
///   lock except for the free-list link
pub struct BufferFrame {
    latch: RwLock<()>,
    pid: AtomicU64,
    state: AtomicU8,
    pin_count: AtomicU32,
    keep_in_memory: AtomicBool,
    page_gsn: AtomicU64,
    last_written_gsn: AtomicU64,
    next_free: AtomicU32,
}

impl BufferFrame {
    /// Create a new free frame.
    pub fn new() -> Self {
        Self {
            latch: RwLock::new(()),
            pid: AtomicU64::new(PageId::INVALID.0),
            state: AtomicU8::new(FrameState::Free as u8),
            pin_count: AtomicU32::new(0),
            keep_in_memory: AtomicBool::new(false),
            page_gsn: AtomicU64::new(0),
            last_written_gsn: AtomicU64::new(0),
            next_free: AtomicU32::new(u32::MAX),
        }
    }

    #[inline]
    pub(crate) fn latch(&self) -> &RwLock<()> {
        &self.latch
    }

    // ========================================================================
    // Identity and state
    // ========================================================================

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let pid = PageId(self.pid.load(Ordering::Acquire));
        (pid != PageId::INVALID).then_some(pid)
    }

    #[inline]
    pub(crate) fn set_page_id(&self, pid: PageId) {
        self.pid.store(pid.0, Ordering::Release);
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        FrameState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: FrameState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.state() == FrameState::Free
    }

    #[inline]
    pub fn keep_in_memory(&self) -> bool {
        self.keep_in_memory.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_keep_in_memory(&self, keep: bool) {
        self.keep_in_memory.store(keep, Ordering::Relaxed);
    }

    // ========================================================================
    // Pin count operations (Atomic)
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // GSN tracking
    // ========================================================================

    #[inline]
    pub fn page_gsn(&self) -> u64 {
        self.page_gsn.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_page_gsn(&self, gsn: u64) {
        self.page_gsn.store(gsn, Ordering::Release);
    }

    #[inline]
    pub fn last_written_gsn(&self) -> u64 {
        self.last_written_gsn.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_last_written_gsn(&self, gsn: u64) {
        self.last_written_gsn.store(gsn, Ordering::Release);
    }

    /// A resident page is dirty when its GSN moved past the last writeback.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        !self.is_free() && self.page_gsn() != self.last_written_gsn()
    }

    // ========================================================================
    // Free-list link
    // ========================================================================

    #[inline]
    pub(crate) fn next_free(&self) -> u32 {
        self.next_free.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_next_free(&self, next: u32) {
        self.next_free.store(next, Ordering::Release);
    }

    /// Reset to the free state. Caller owns the frame exclusively.
    pub(crate) fn reset(&self) {
        self.pid.store(PageId::INVALID.0, Ordering::Release);
        self.set_state(FrameState::Free);
        self.pin_count.store(0, Ordering::Release);
        self.keep_in_memory.store(false, Ordering::Relaxed);
        self.page_gsn.store(0, Ordering::Release);
        self.last_written_gsn.store(0, Ordering::Release);
    }
}

impl Default for BufferFrame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = BufferFrame::new();
        assert!(frame.is_free());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert_eq!(frame.page_id(), None);
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = BufferFrame::new();

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    #[should_panic(expected = "pin count underflow")]
    fn test_frame_unpin_underflow() {
        BufferFrame::new().unpin();
    }

    #[test]
    fn test_dirty_derives_from_gsn() {
        let frame = BufferFrame::new();
        frame.set_page_id(PageId::new(1));
        frame.set_state(FrameState::Hot);
        frame.set_last_written_gsn(NEVER_WRITTEN);
        assert!(frame.is_dirty());

        frame.set_last_written_gsn(0);
        assert!(!frame.is_dirty());

        frame.set_page_gsn(5);
        assert!(frame.is_dirty());

        frame.set_last_written_gsn(5);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_free_frame_is_never_dirty() {
        let frame = BufferFrame::new();
        frame.set_page_gsn(9);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_reset() {
        let frame = BufferFrame::new();
        frame.set_page_id(PageId::new(99));
        frame.set_state(FrameState::Cool);
        frame.pin();
        frame.set_keep_in_memory(true);

        frame.reset();

        assert!(frame.is_free());
        assert_eq!(frame.page_id(), None);
        assert!(!frame.is_pinned());
        assert!(!frame.keep_in_memory());
    }

    #[test]
    fn test_frame_concurrent_pin() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(BufferFrame::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let frame_clone = Arc::clone(&frame);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    frame_clone.pin();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frame.pin_count(), 1000);
    }
}
