//! Hybrid buffer pool - the page caching layer.
//!
//! The [`BufferPool`] provides:
//! - Page caching between disk and memory over a fixed frame arena
//! - Pin-based reference counting through RAII guards
//! - GSN-based dirty tracking with writeback before a frame is reused
//! - Partitioned ownership of frames and PIDs
//! - A HOT → COOL → EVICTED state machine driven by the cooling walker

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::buffer::arena::FrameArena;
use crate::buffer::frame::{BufferFrame, FrameState, NEVER_WRITTEN};
use crate::buffer::partition::{IoState, Partition};
use crate::buffer::replacer::Replacer;
use crate::buffer::swip::Swip;
use crate::buffer::{cooling, BufferPoolStats, PageReadGuard, PageWriteGuard};
use crate::common::config::{BufferPoolConfig, PAGE_SIZE};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::{PageHeader, PageType};
use crate::storage::DiskManager;

/// Manages a partitioned pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                         BufferPool                           │
/// │  ┌────────────────────────────────────────────────────────┐  │
/// │  │  FrameArena (anonymous mmap)  [F0] [F1] [F2] [F3] ...  │  │
/// │  └────────────────────────────────────────────────────────┘  │
/// │  ┌──────────────── Partition p (pid % n == p) ───────────┐   │
/// │  │ table: PageId → Swip   io: PageId → Reading + Condvar │   │
/// │  │ free_list (lock-free)  replacer (LRU)  cooling (FIFO) │   │
/// │  │ pids: next + stride + freed stack                     │   │
/// │  └───────────────────────────────────────────────────────┘   │
/// │  disk: DiskManager      walker: background cooling thread    │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `frames`: fixed at startup, each frame has its own latch and atomics
/// - partition `table`: pins, unpins and evictions of that partition's
///   frames serialize on it
/// - partition `io`: coalesces concurrent reads of the same PID
/// - `disk`: positioned I/O, no lock
/// - `stats`: atomic counters
///
/// # Usage
/// ```ignore
/// let disk = DiskManager::create("test.db")?;
/// let pool = BufferPool::new(BufferPoolConfig::with_frames(10), disk)?;
///
/// let mut guard = pool.new_page()?;
/// guard.as_mut_slice()[0] = 0xAB;
/// let pid = guard.page_id();
/// drop(guard);
///
/// let guard = pool.fetch_page_read(pid)?;
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPool {
    inner: Arc<PoolInner>,
    walker: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between the pool handle, its guards and the cooling walker.
pub(crate) struct PoolInner {
    frames: Vec<BufferFrame>,
    pub(crate) arena: FrameArena,
    partitions: Vec<Partition>,
    partition_mask: usize,
    disk: DiskManager,
    stats: BufferPoolStats,
    gsn: AtomicU64,
    pub(crate) config: BufferPoolConfig,
    pub(crate) stop: AtomicBool,
    pub(crate) wakeup: Mutex<bool>,
    pub(crate) wakeup_cv: Condvar,
}

impl BufferPool {
    /// Create a buffer pool over `disk`.
    ///
    /// Maps the frame arena, spreads frames round-robin over the partitions,
    /// pushes every frame onto its partition's free list and, if configured,
    /// starts the cooling walker.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if the configuration is inconsistent
    /// - I/O errors if the anonymous mapping cannot be created
    pub fn new(config: BufferPoolConfig, disk: DiskManager) -> Result<Self> {
        config.validate()?;

        let frame_count = config.frame_count();
        let partition_count = config.partition_count();
        let arena = FrameArena::new(frame_count)?;
        let frames: Vec<BufferFrame> = (0..frame_count).map(|_| BufferFrame::new()).collect();

        let mut owned: Vec<Vec<FrameId>> = vec![Vec::new(); partition_count];
        for id in 0..frame_count {
            owned[id % partition_count].push(FrameId::new(id));
        }

        let first_unused_pid = disk.page_count();
        let partitions: Vec<Partition> = owned
            .iter()
            .enumerate()
            .map(|(p, ids)| {
                let partition = Partition::new(
                    p,
                    partition_count,
                    ids.len(),
                    config.free_pct,
                    config.cool_pct,
                    first_unused_pid,
                );
                partition.free_list.push_chain(&frames, ids);
                partition
            })
            .collect();

        info!(
            frames = frame_count,
            partitions = partition_count,
            free_limit = partitions[0].free_frames_limit,
            cooling_bound = partitions[0].cooling_frames_upper_bound,
            "buffer pool started"
        );

        let inner = Arc::new(PoolInner {
            frames,
            arena,
            partitions,
            partition_mask: partition_count - 1,
            disk,
            stats: BufferPoolStats::new(),
            gsn: AtomicU64::new(0),
            config,
            stop: AtomicBool::new(false),
            wakeup: Mutex::new(false),
            wakeup_cv: Condvar::new(),
        });

        let walker = if inner.config.background_cooling {
            Some(cooling::spawn_walker(Arc::clone(&inner))?)
        } else {
            None
        };

        Ok(Self {
            inner,
            walker: Mutex::new(walker),
        })
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for the reserved and sentinel PIDs
    /// - `Error::IoReadExceedFileSize` if the page was never written
    /// - `Error::NoAvailablePage` if every frame of the partition is pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.inner.fetch(page_id)?;
        let lock = self.inner.frame(frame_id).latch().read();
        Ok(PageReadGuard::new(&self.inner, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same as `fetch_page_read`, but returns an exclusive guard.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.inner.fetch(page_id)?;
        let lock = self.inner.frame(frame_id).latch().write();
        Ok(PageWriteGuard::new(&self.inner, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Allocate a fresh page and return it exclusively latched and pinned.
    ///
    /// Starts at a random partition and moves on to the next one while a
    /// partition has neither a free nor an evictable frame.
    ///
    /// # Errors
    /// - `Error::NoAvailablePage` if every frame in the pool is pinned
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let inner = &*self.inner;
        let n = inner.partitions.len();
        let start = rand::thread_rng().gen_range(0..n);

        for step in 0..n {
            let partition = &inner.partitions[(start + step) % n];
            match inner.acquire_frame(partition) {
                Ok(frame_id) => return Ok(inner.install_new_page(partition, frame_id)),
                Err(Error::NoAvailablePage) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::NoAvailablePage)
    }

    /// Return a page held exclusively by `guard` to the pool.
    ///
    /// The PID goes back onto its partition's freed-PID stack and the frame
    /// onto the free list. The page content is discarded.
    ///
    /// # Errors
    /// - `Error::PagePinned` if someone else has pinned the page; the guard
    ///   is released normally in that case
    pub fn reclaim_page(&self, mut guard: PageWriteGuard<'_>) -> Result<()> {
        let inner = &*self.inner;
        let frame_id = guard.frame_id();
        let page_id = guard.page_id();
        let partition = inner.partition_of(page_id);
        let frame = inner.frame(frame_id);

        let mut table = partition.table.lock();
        if frame.pin_count() != 1 {
            drop(table);
            return Err(Error::PagePinned(page_id));
        }
        let latch = guard.take_latch();
        table.remove(&page_id);
        partition.pids.lock().free(page_id);
        frame.reset();
        drop(table);
        drop(latch);

        partition.free_list.push(&inner.frames, frame_id);
        debug!(page = page_id.0, frame = frame_id.0, "page reclaimed");
        Ok(())
    }

    /// Drop a page from the pool without writing it back.
    ///
    /// Unknown PIDs are ignored. The PID is returned to its partition's
    /// allocator.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is pinned or being read in
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        self.inner.delete(page_id)
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write a resident page back to disk if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        self.inner.flush(page_id)
    }

    /// Write every dirty resident page back to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        self.inner.flush_all()
    }

    // ========================================================================
    // Public API: Cooling
    // ========================================================================

    /// Run one pass of the cooling walker on the calling thread.
    pub fn run_cooling_pass(&self) -> Result<()> {
        self.inner.cooling_pass()
    }

    /// Stop the cooling walker and flush every dirty page. Idempotent.
    pub fn shutdown(&self) -> Result<()> {
        if let Some(handle) = self.walker.lock().take() {
            self.inner.stop.store(true, Ordering::Release);
            self.inner.wake_walker();
            if handle.join().is_err() {
                error!("cooling walker panicked");
            }
        }
        self.inner.flush_all()
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.inner.stats
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.inner.config
    }

    pub fn pool_size(&self) -> usize {
        self.inner.frames.len()
    }

    pub fn partition_count(&self) -> usize {
        self.inner.partitions.len()
    }

    /// Frames currently on the free lists (advisory).
    pub fn free_frame_count(&self) -> usize {
        self.inner.partitions.iter().map(|p| p.free_list.len()).sum()
    }

    /// Frames currently in the cooling queues.
    pub fn cooling_frame_count(&self) -> usize {
        self.inner.partitions.iter().map(Partition::cooling_len).sum()
    }

    /// Pages currently held by a hot or cool frame.
    pub fn resident_page_count(&self) -> usize {
        self.inner
            .partitions
            .iter()
            .map(|p| p.table.lock().values().filter(|s| s.is_resident()).count())
            .sum()
    }

    /// Pin count of a resident page, `None` if the page is not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let partition = self.inner.partition_of(page_id);
        let table = partition.table.lock();
        let frame_id = table.get(&page_id)?.as_frame()?;
        Some(self.inner.frame(frame_id).pin_count())
    }

    /// Current swip of a page: hot or cool while resident, evicted while it
    /// lives only on disk, `None` for PIDs that hold no page.
    pub fn swip(&self, page_id: PageId) -> Option<Swip> {
        let partition = self.inner.partition_of(page_id);
        if let Some(swip) = partition.table.lock().get(&page_id) {
            return Some(*swip);
        }
        self.inner
            .on_disk(partition, page_id)
            .then(|| Swip::evicted(page_id))
    }

    /// Frame state of a resident page.
    pub fn frame_state(&self, page_id: PageId) -> Option<FrameState> {
        let frame_id = self.swip(page_id)?.as_frame()?;
        Some(self.inner.frame(frame_id).state())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "failed to flush buffer pool on drop");
        }
    }
}

impl PoolInner {
    #[inline]
    pub(crate) fn frame(&self, frame_id: FrameId) -> &BufferFrame {
        &self.frames[frame_id.0]
    }

    #[inline]
    pub(crate) fn frames(&self) -> &[BufferFrame] {
        &self.frames
    }

    #[inline]
    pub(crate) fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    #[inline]
    pub(crate) fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    #[inline]
    fn partition_of(&self, page_id: PageId) -> &Partition {
        &self.partitions[page_id.0 as usize & self.partition_mask]
    }

    #[inline]
    fn partition_of_frame(&self, frame_id: FrameId) -> &Partition {
        &self.partitions[frame_id.0 & self.partition_mask]
    }

    pub(crate) fn next_gsn(&self) -> u64 {
        self.gsn.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn wake_walker(&self) {
        let mut pending = self.wakeup.lock();
        *pending = true;
        self.wakeup_cv.notify_one();
    }

    // ========================================================================
    // Internal: Called by page guards on drop
    // ========================================================================

    /// Drop one pin; a frame reaching zero becomes a replacement candidate.
    pub(crate) fn unpin(&self, frame_id: FrameId) {
        let partition = self.partition_of_frame(frame_id);
        let _table = partition.table.lock();
        let frame = self.frame(frame_id);
        if frame.unpin() == 0 {
            // A flush pins without reheating; a cool frame goes back to the
            // cooling queue rather than the replacer.
            if frame.state() == FrameState::Cool {
                let mut cooling = partition.cooling.lock();
                if !cooling.contains(&frame_id) {
                    cooling.push_back(frame_id);
                }
            } else if let Err(e) = partition.replacer.unpin(frame_id) {
                warn!(frame = frame_id.0, error = %e, "replacer rejected unpinned frame");
            }
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    fn fetch(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        let partition = self.partition_of(page_id);

        if let Some(frame_id) = self.pin_resident(partition, page_id) {
            BufferPoolStats::bump(&self.stats.cache_hits);
            return Ok(frame_id);
        }

        let mut io = partition.io.lock();
        loop {
            if let Some(frame_id) = self.pin_resident(partition, page_id) {
                BufferPoolStats::bump(&self.stats.cache_hits);
                return Ok(frame_id);
            }
            if io.contains_key(&page_id) {
                partition.io_cv.wait(&mut io);
                continue;
            }
            break;
        }
        io.insert(page_id, IoState::Reading);
        drop(io);

        BufferPoolStats::bump(&self.stats.cache_misses);
        let loaded = self.load(partition, page_id);

        let mut io = partition.io.lock();
        io.remove(&page_id);
        partition.io_cv.notify_all();
        loaded
    }

    /// Pin `page_id` if it is resident, reheating a cool frame.
    fn pin_resident(&self, partition: &Partition, page_id: PageId) -> Option<FrameId> {
        let mut table = partition.table.lock();
        let swip = *table.get(&page_id)?;
        let frame_id = swip.as_frame()?;
        let frame = self.frame(frame_id);

        if swip.is_cool() {
            table.insert(page_id, swip.heated());
            partition.cooling.lock().retain(|&f| f != frame_id);
            frame.set_state(FrameState::Hot);
        }
        frame.pin();
        partition.replacer.pin(frame_id);
        Some(frame_id)
    }

    /// Read `page_id` from disk into a victim frame and publish it hot.
    fn load(&self, partition: &Partition, page_id: PageId) -> Result<FrameId> {
        let frame_id = self.acquire_frame(partition)?;
        let frame = self.frame(frame_id);
        frame.set_page_id(page_id);
        frame.set_state(FrameState::Loaded);

        let read = {
            let _latch = frame.latch().write();
            // SAFETY: exclusive latch held for the duration of the borrow.
            let page = unsafe { self.arena.page_mut(frame_id) };
            self.disk
                .read_page(page_id, page)
                .and_then(|()| PageHeader::verify(page))
                .map(|()| PageHeader::read_gsn(page))
        };

        let gsn = match read {
            Ok(gsn) => gsn,
            Err(e) => {
                frame.reset();
                partition.free_list.push(&self.frames, frame_id);
                return Err(e);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_read);
        self.gsn.fetch_max(gsn, Ordering::AcqRel);

        frame.set_page_gsn(gsn);
        frame.set_last_written_gsn(gsn);
        frame.pin();
        frame.set_state(FrameState::Hot);
        partition.table.lock().insert(page_id, Swip::hot(frame_id));
        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Take a frame for a new resident page: the free list first, then the
    /// oldest cool frames, then the LRU victim.
    pub(crate) fn acquire_frame(&self, partition: &Partition) -> Result<FrameId> {
        if let Some(frame_id) = partition.free_list.pop(&self.frames) {
            if partition.needs_cooling() {
                self.wake_walker();
            }
            return Ok(frame_id);
        }

        let mut skipped = Vec::new();
        let found = self.evict_for_reuse(partition, &mut skipped);
        self.requeue(partition, skipped);
        found?.ok_or(Error::NoAvailablePage)
    }

    fn evict_for_reuse(
        &self,
        partition: &Partition,
        skipped: &mut Vec<FrameId>,
    ) -> Result<Option<FrameId>> {
        loop {
            let next = partition.cooling.lock().pop_front();
            let Some(frame_id) = next else { break };
            if self.try_evict(partition, frame_id, skipped)? {
                return Ok(Some(frame_id));
            }
        }
        while let Some(frame_id) = partition.replacer.victim() {
            if self.try_evict(partition, frame_id, skipped)? {
                return Ok(Some(frame_id));
            }
        }
        Ok(None)
    }

    /// [`evict`](Self::evict), remembering the frame in `skipped` unless it
    /// was evicted.
    pub(crate) fn try_evict(
        &self,
        partition: &Partition,
        frame_id: FrameId,
        skipped: &mut Vec<FrameId>,
    ) -> Result<bool> {
        let evicted = self.evict(partition, frame_id);
        if !matches!(evicted, Ok(true)) {
            skipped.push(frame_id);
        }
        evicted
    }

    /// Put frames that could not be evicted back where they came from.
    pub(crate) fn requeue(&self, partition: &Partition, frames: Vec<FrameId>) {
        if frames.is_empty() {
            return;
        }
        let _table = partition.table.lock();
        for frame_id in frames {
            let frame = self.frame(frame_id);
            if frame.is_pinned() {
                // The last unpin hands it back to the replacer.
                continue;
            }
            match frame.state() {
                FrameState::Hot => {
                    if let Err(e) = partition.replacer.unpin(frame_id) {
                        warn!(frame = frame_id.0, error = %e, "replacer rejected requeued frame");
                    }
                }
                FrameState::Cool => {
                    let mut cooling = partition.cooling.lock();
                    if !cooling.contains(&frame_id) {
                        cooling.push_back(frame_id);
                    }
                }
                FrameState::Free | FrameState::Loaded => {}
            }
        }
    }

    /// Evict the page held by `frame_id`, writing it back first if dirty.
    ///
    /// Returns `Ok(false)` if the frame is pinned, latched, flagged
    /// keep-in-memory, or no longer holds a resident page. On success the
    /// frame is reset and owned by the caller; it is not on the free list.
    pub(crate) fn evict(&self, partition: &Partition, frame_id: FrameId) -> Result<bool> {
        let frame = self.frame(frame_id);
        let mut table = partition.table.lock();

        if frame.is_pinned() || frame.keep_in_memory() {
            return Ok(false);
        }
        if !matches!(frame.state(), FrameState::Hot | FrameState::Cool) {
            return Ok(false);
        }
        let Some(page_id) = frame.page_id() else {
            return Ok(false);
        };
        let Some(_latch) = frame.latch().try_write() else {
            return Ok(false);
        };
        // A pin and unpin since the frame was picked may have put it back
        // into the replacer or the cooling queue.
        partition.replacer.pin(frame_id);
        partition.cooling.lock().retain(|&f| f != frame_id);

        if frame.is_dirty() {
            // SAFETY: exclusive latch held.
            let page = unsafe { self.arena.page(frame_id) };
            self.write_back(frame, page_id, page)?;
        }

        table.remove(&page_id);
        frame.reset();
        BufferPoolStats::bump(&self.stats.evictions);
        debug!(page = page_id.0, frame = frame_id.0, "page evicted");
        Ok(true)
    }

    /// Set up a freshly acquired frame as a new, exclusively latched page.
    fn install_new_page<'a>(&'a self, partition: &Partition, frame_id: FrameId) -> PageWriteGuard<'a> {
        let page_id = partition.pids.lock().allocate();
        let frame = self.frame(frame_id);
        let latch = frame.latch().write();

        // SAFETY: exclusive latch held.
        let page = unsafe { self.arena.page_mut(frame_id) };
        page.fill(0);
        let mut header = PageHeader::new(PageType::Data);
        header.debug_tag = page_id.0;
        header.write_to(page);

        frame.set_page_id(page_id);
        frame.set_page_gsn(0);
        frame.set_last_written_gsn(NEVER_WRITTEN);
        frame.pin();
        frame.set_state(FrameState::Hot);
        partition.table.lock().insert(page_id, Swip::hot(frame_id));

        PageWriteGuard::new(self, frame_id, page_id, latch)
    }

    fn delete(&self, page_id: PageId) -> Result<()> {
        let partition = self.partition_of(page_id);
        let io = partition.io.lock();
        if io.contains_key(&page_id) {
            return Err(Error::PagePinned(page_id));
        }
        let mut table = partition.table.lock();
        drop(io);

        let Some(frame_id) = table.get(&page_id).and_then(|swip| swip.as_frame()) else {
            if self.on_disk(partition, page_id) {
                partition.pids.lock().free(page_id);
            }
            return Ok(());
        };

        let frame = self.frame(frame_id);
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id));
        }
        let Some(latch) = frame.latch().try_write() else {
            return Err(Error::PagePinned(page_id));
        };

        partition.replacer.pin(frame_id);
        partition.cooling.lock().retain(|&f| f != frame_id);
        table.remove(&page_id);
        partition.pids.lock().free(page_id);
        frame.reset();
        drop(latch);
        drop(table);

        partition.free_list.push(&self.frames, frame_id);
        Ok(())
    }

    /// True if `page_id` has been written to disk and not deleted since.
    /// Only resident pages have an entry in the partition table.
    fn on_disk(&self, partition: &Partition, page_id: PageId) -> bool {
        page_id.is_valid()
            && page_id.0 < self.disk.page_count()
            && !partition.pids.lock().is_freed(page_id)
    }

    // ========================================================================
    // Internal: Writeback
    // ========================================================================

    /// Write `page` out under its PID and mark the frame clean up to the GSN
    /// it carried. The caller holds the frame latch.
    fn write_back(&self, frame: &BufferFrame, page_id: PageId, page: &[u8]) -> Result<()> {
        let gsn = frame.page_gsn();
        let mut out = vec![0u8; PAGE_SIZE];
        out.copy_from_slice(page);
        PageHeader::stamp_checksum(&mut out);

        self.disk.write_page(page_id, &out)?;
        frame.set_last_written_gsn(gsn);
        BufferPoolStats::bump(&self.stats.pages_written);
        debug!(page = page_id.0, gsn, "page written back");
        Ok(())
    }

    fn flush(&self, page_id: PageId) -> Result<()> {
        let partition = self.partition_of(page_id);
        let frame_id = {
            let table = partition.table.lock();
            let Some(frame_id) = table.get(&page_id).and_then(Swip::as_frame) else {
                return Ok(());
            };
            self.frame(frame_id).pin();
            partition.replacer.pin(frame_id);
            frame_id
        };

        let frame = self.frame(frame_id);
        let result = {
            let _latch = frame.latch().read();
            if frame.is_dirty() {
                // SAFETY: shared latch held.
                let page = unsafe { self.arena.page(frame_id) };
                self.write_back(frame, page_id, page)
            } else {
                Ok(())
            }
        };
        self.unpin(frame_id);
        result
    }

    pub(crate) fn flush_all(&self) -> Result<()> {
        for partition in &self.partitions {
            let resident: Vec<PageId> = {
                let table = partition.table.lock();
                table
                    .iter()
                    .filter(|(_, swip)| swip.is_resident())
                    .map(|(&pid, _)| pid)
                    .collect()
            };
            for page_id in resident {
                self.flush(page_id)?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn table_snapshot(&self, partition: usize) -> std::collections::HashMap<PageId, Swip> {
        self.partitions[partition].table.lock().clone()
    }
}
