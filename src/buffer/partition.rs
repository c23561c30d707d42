//! Buffer pool partitions.
//!
//! A [`Partition`] owns a slice of the frames and a stripe of the PID space:
//! partition `p` of `n` issues PIDs with `pid % n == p`. Everything a fetch,
//! allocation or eviction touches for one PID lives in that PID's partition.
//!
//! # Lock order
//! `io` → `table` → `cooling`. The replacer's internal lock and the frame
//! latches are leaves; a frame latch is never *waited on* while `table` is
//! held (only `try_*` acquisitions happen under it).

use std::collections::{HashMap, VecDeque};

use parking_lot::{Condvar, Mutex};

use crate::buffer::free_list::FreeList;
use crate::buffer::replacer::LruReplacer;
use crate::buffer::swip::Swip;
use crate::common::{FrameId, PageId};

/// State of a PID whose page is being read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IoState {
    Reading,
}

/// Issues PIDs for one partition.
///
/// Freed PIDs are reissued (most recent first) before new ones are minted.
#[derive(Debug)]
pub(crate) struct PidAllocator {
    next_pid: u64,
    distance: u64,
    freed: Vec<PageId>,
}

impl PidAllocator {
    /// Allocator for `partition` of `partitions`, minting PIDs at or above
    /// `first_unused`. PID 0 is never minted.
    pub(crate) fn new(partition: usize, partitions: usize, first_unused: u64) -> Self {
        let distance = partitions as u64;
        let floor = first_unused.max(1);
        let base = floor - floor % distance + partition as u64;
        let next_pid = if base < floor { base + distance } else { base };
        Self {
            next_pid,
            distance,
            freed: Vec::new(),
        }
    }

    pub(crate) fn allocate(&mut self) -> PageId {
        if let Some(pid) = self.freed.pop() {
            return pid;
        }
        let pid = PageId::new(self.next_pid);
        self.next_pid += self.distance;
        pid
    }

    pub(crate) fn free(&mut self, pid: PageId) {
        if !self.freed.contains(&pid) {
            self.freed.push(pid);
        }
    }

    pub(crate) fn is_freed(&self, pid: PageId) -> bool {
        self.freed.contains(&pid)
    }

    #[cfg(test)]
    pub(crate) fn freed_count(&self) -> usize {
        self.freed.len()
    }
}

/// One horizontal slice of the buffer pool.
pub(crate) struct Partition {
    pub(crate) id: usize,
    pub(crate) free_list: FreeList,
    pub(crate) replacer: LruReplacer,
    /// FIFO of cool frames, oldest first.
    pub(crate) cooling: Mutex<VecDeque<FrameId>>,
    /// PIDs with a disk read in flight; fetchers of the same PID wait on
    /// `io_cv` instead of issuing a second read.
    pub(crate) io: Mutex<HashMap<PageId, IoState>>,
    pub(crate) io_cv: Condvar,
    /// Swip of every resident page. Evicted pages drop out; a fetch of a
    /// PID with no entry reads it from disk.
    pub(crate) table: Mutex<HashMap<PageId, Swip>>,
    pub(crate) pids: Mutex<PidAllocator>,
    pub(crate) frame_count: usize,
    pub(crate) free_frames_limit: usize,
    pub(crate) cooling_frames_upper_bound: usize,
}

impl Partition {
    pub(crate) fn new(
        id: usize,
        partitions: usize,
        frame_count: usize,
        free_pct: usize,
        cool_pct: usize,
        first_unused_pid: u64,
    ) -> Self {
        Self {
            id,
            free_list: FreeList::new(),
            replacer: LruReplacer::new(frame_count),
            cooling: Mutex::new(VecDeque::new()),
            io: Mutex::new(HashMap::new()),
            io_cv: Condvar::new(),
            table: Mutex::new(HashMap::new()),
            pids: Mutex::new(PidAllocator::new(id, partitions, first_unused_pid)),
            frame_count,
            free_frames_limit: frame_count * free_pct / 100,
            cooling_frames_upper_bound: (frame_count * cool_pct / 100).max(1),
        }
    }

    /// True when the cooling walker should run on this partition.
    pub(crate) fn needs_cooling(&self) -> bool {
        self.free_list.len() < self.free_frames_limit
    }

    pub(crate) fn cooling_len(&self) -> usize {
        self.cooling.lock().len()
    }
}
