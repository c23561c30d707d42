//! Cooling walker.
//!
//! Keeps each partition's free list topped up without waiting for a fetch
//! to hit an empty list. A pass over a partition whose free list is below
//! `free_frames_limit` runs in two steps:
//!
//! 1. Demote: take LRU victims, mark their swips COOL and append them to
//!    the cooling FIFO until it holds `cooling_frames_upper_bound` frames.
//! 2. Evict: pop the oldest cool frames, write back the dirty ones, rewrite
//!    the swip as evicted and push the frame onto the free list until the
//!    free list reaches its limit.
//!
//! A cool frame that is fetched before it reaches the front of the queue is
//! reheated and leaves the queue.
//!
//! The walker thread sleeps on a condvar between passes. Fetches wake it
//! when they take the free list below the limit; otherwise it wakes every
//! `cooling_interval`.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::buffer::buffer_pool::PoolInner;
use crate::buffer::frame::FrameState;
use crate::buffer::partition::Partition;
use crate::buffer::replacer::Replacer;
use crate::buffer::swip::Swip;
use crate::buffer::BufferPoolStats;
use crate::common::Result;

pub(crate) fn spawn_walker(inner: Arc<PoolInner>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("policydb-cooling".into())
        .spawn(move || walk(&inner))?;
    Ok(handle)
}

fn walk(inner: &PoolInner) {
    debug!("cooling walker started");
    loop {
        {
            let mut pending = inner.wakeup.lock();
            if !*pending && !inner.stop.load(Ordering::Acquire) {
                inner
                    .wakeup_cv
                    .wait_for(&mut pending, inner.config.cooling_interval);
            }
            *pending = false;
        }
        if inner.stop.load(Ordering::Acquire) {
            break;
        }
        if let Err(e) = inner.cooling_pass() {
            warn!(error = %e, "cooling pass failed");
        }
    }
    debug!("cooling walker stopped");
}

impl PoolInner {
    pub(crate) fn cooling_pass(&self) -> Result<()> {
        for partition in self.partitions() {
            if partition.needs_cooling() {
                self.cool_partition(partition)?;
            }
        }
        Ok(())
    }

    fn cool_partition(&self, partition: &Partition) -> Result<()> {
        self.demote_hot_frames(partition);

        let mut skipped = Vec::new();
        let mut result = Ok(());
        while partition.free_list.len() < partition.free_frames_limit {
            let next = partition.cooling.lock().pop_front();
            let Some(frame_id) = next else { break };
            match self.try_evict(partition, frame_id, &mut skipped) {
                Ok(true) => partition.free_list.push(self.frames(), frame_id),
                Ok(false) => {}
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.requeue(partition, skipped);
        result
    }

    fn demote_hot_frames(&self, partition: &Partition) {
        let mut skipped = Vec::new();
        while partition.cooling_len() < partition.cooling_frames_upper_bound {
            let Some(frame_id) = partition.replacer.victim() else {
                break;
            };
            let frame = self.frame(frame_id);
            let mut table = partition.table.lock();

            if frame.is_pinned() || frame.state() != FrameState::Hot {
                continue;
            }
            if frame.keep_in_memory() {
                skipped.push(frame_id);
                continue;
            }
            let Some(page_id) = frame.page_id() else {
                continue;
            };

            // The frame may have been pinned and unpinned again since it was
            // picked, which re-enters it into the replacer.
            partition.replacer.pin(frame_id);
            table.insert(page_id, Swip::hot(frame_id).cooled());
            frame.set_state(FrameState::Cool);
            partition.cooling.lock().push_back(frame_id);
            BufferPoolStats::bump(&self.stats().frames_cooled);
        }
        self.requeue(partition, skipped);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use tempfile::tempdir;

    use crate::buffer::{BufferPool, FrameState};
    use crate::common::{BufferPoolConfig, PageId};
    use crate::storage::DiskManager;

    fn cooling_config(background: bool) -> BufferPoolConfig {
        BufferPoolConfig {
            free_pct: 20,
            cool_pct: 30,
            background_cooling: background,
            cooling_interval: Duration::from_millis(1),
            ..BufferPoolConfig::with_frames(10)
        }
    }

    fn fill(pool: &BufferPool) -> Vec<PageId> {
        (0..10u8)
            .map(|i| {
                let mut guard = pool.new_page().unwrap();
                guard.as_mut_slice()[0] = i;
                guard.page_id()
            })
            .collect()
    }

    #[test]
    fn test_cooling_pass_demotes_then_evicts() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let pool = BufferPool::new(cooling_config(false), dm).unwrap();
        let pids = fill(&pool);
        assert_eq!(pool.free_frame_count(), 0);

        pool.run_cooling_pass().unwrap();

        let stats = pool.stats().snapshot();
        assert_eq!(stats.frames_cooled, 3);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.pages_written, 2);
        assert_eq!(pool.free_frame_count(), 2);
        assert_eq!(pool.cooling_frame_count(), 1);

        assert!(pool.swip(pids[0]).unwrap().is_evicted());
        assert!(pool.swip(pids[1]).unwrap().is_evicted());
        assert!(pool.swip(pids[2]).unwrap().is_cool());
        assert_eq!(pool.frame_state(pids[2]), Some(FrameState::Cool));
        assert!(pool.swip(pids[3]).unwrap().is_hot());
    }

    #[test]
    fn test_fetch_reheats_cool_frame() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let pool = BufferPool::new(cooling_config(false), dm).unwrap();
        let pids = fill(&pool);
        pool.run_cooling_pass().unwrap();

        let guard = pool.fetch_page_read(pids[2]).unwrap();
        assert_eq!(guard.as_slice()[0], 2);
        drop(guard);

        assert!(pool.swip(pids[2]).unwrap().is_hot());
        assert_eq!(pool.cooling_frame_count(), 0);
        assert_eq!(pool.stats().snapshot().cache_hits, 1);

        let guard = pool.fetch_page_read(pids[0]).unwrap();
        assert_eq!(guard.as_slice()[0], 0);
        assert_eq!(pool.stats().snapshot().cache_misses, 1);
    }

    #[test]
    fn test_pass_is_noop_above_free_limit() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let pool = BufferPool::new(cooling_config(false), dm).unwrap();
        drop(pool.new_page().unwrap());

        pool.run_cooling_pass().unwrap();

        assert_eq!(pool.stats().snapshot().frames_cooled, 0);
        assert_eq!(pool.cooling_frame_count(), 0);
    }

    #[test]
    fn test_background_walker_refills_free_list() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        let pool = BufferPool::new(cooling_config(true), dm).unwrap();
        let pids = fill(&pool);

        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.free_frame_count() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(pool.free_frame_count() >= 2);

        pool.shutdown().unwrap();
        let guard = pool.fetch_page_read(pids[0]).unwrap();
        assert_eq!(guard.as_slice()[0], 0);
    }
}
