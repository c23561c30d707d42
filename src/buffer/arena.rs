//! Frame arena - one anonymous mapping holding every page frame.
//!
//! The mapping is created once at startup and never moves, which is what
//! lets the rest of the pool refer to frames by index.

use std::ptr::NonNull;
use std::thread;

use memmap2::MmapMut;

use crate::common::config::PAGE_SIZE;
use crate::common::{FrameId, Result};

pub(crate) struct FrameArena {
    // Held only to keep the mapping alive; all access goes through `base`.
    _mmap: MmapMut,
    base: NonNull<u8>,
    frames: usize,
}

// SAFETY: the arena is a plain byte region. Every access to a frame's bytes
// goes through `page`/`page_mut`, whose callers hold that frame's latch, so
// concurrent access to one frame is serialized by the latch and distinct
// frames never overlap.
unsafe impl Send for FrameArena {}
unsafe impl Sync for FrameArena {}

impl FrameArena {
    /// Map `frames × PAGE_SIZE` bytes and prefault them in parallel.
    pub(crate) fn new(frames: usize) -> Result<Self> {
        let mut mmap = MmapMut::map_anon(frames * PAGE_SIZE)?;

        let workers = thread::available_parallelism().map_or(1, |n| n.get());
        let chunk_frames = frames.div_ceil(workers).max(1);
        thread::scope(|scope| {
            for chunk in mmap.chunks_mut(chunk_frames * PAGE_SIZE) {
                scope.spawn(move || {
                    for page in chunk.chunks_mut(PAGE_SIZE) {
                        page[0] = 0;
                    }
                });
            }
        });

        let base = NonNull::new(mmap.as_mut_ptr())
            .ok_or_else(|| std::io::Error::other("anonymous mapping returned null"))?;

        Ok(Self {
            _mmap: mmap,
            base,
            frames,
        })
    }

    #[inline]
    pub(crate) fn frame_count(&self) -> usize {
        self.frames
    }

    /// Shared view of a frame's page bytes.
    ///
    /// # Safety
    /// The caller must hold the frame's latch (shared or exclusive) for the
    /// whole lifetime of the returned slice.
    #[inline]
    pub(crate) unsafe fn page(&self, frame: FrameId) -> &[u8] {
        debug_assert!(frame.0 < self.frames);
        std::slice::from_raw_parts(self.base.as_ptr().add(frame.0 * PAGE_SIZE), PAGE_SIZE)
    }

    /// Exclusive view of a frame's page bytes.
    ///
    /// # Safety
    /// The caller must hold the frame's latch exclusively for the whole
    /// lifetime of the returned slice.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub(crate) unsafe fn page_mut(&self, frame: FrameId) -> &mut [u8] {
        debug_assert!(frame.0 < self.frames);
        std::slice::from_raw_parts_mut(self.base.as_ptr().add(frame.0 * PAGE_SIZE), PAGE_SIZE)
    }
}
