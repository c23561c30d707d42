//! LRU (Least Recently Used) replacement policy.
//!
//! Keeps unpinned frames in insertion order: `unpin` inserts at the front,
//! `victim` pops from the back, so the frame unpinned longest ago goes first.
//!
//! # Complexity
//! All operations are O(1): the list is doubly linked through a map keyed by
//! frame id, which doubles as the membership index.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::buffer::replacer::Replacer;
use crate::common::{Error, FrameId, Result};

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: Option<FrameId>,
    next: Option<FrameId>,
}

#[derive(Debug, Default)]
struct LruList {
    links: HashMap<FrameId, Link>,
    /// Most recently unpinned.
    head: Option<FrameId>,
    /// Next victim.
    tail: Option<FrameId>,
}

impl LruList {
    fn push_front(&mut self, frame_id: FrameId) {
        let link = Link {
            prev: None,
            next: self.head,
        };
        if let Some(old_head) = self.head {
            if let Some(old) = self.links.get_mut(&old_head) {
                old.prev = Some(frame_id);
            }
        } else {
            self.tail = Some(frame_id);
        }
        self.head = Some(frame_id);
        self.links.insert(frame_id, link);
    }

    fn remove(&mut self, frame_id: FrameId) -> bool {
        let Some(link) = self.links.remove(&frame_id) else {
            return false;
        };
        match link.prev {
            Some(prev) => {
                if let Some(p) = self.links.get_mut(&prev) {
                    p.next = link.next;
                }
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => {
                if let Some(n) = self.links.get_mut(&next) {
                    n.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }
        true
    }
}

/// LRU replacer serialized by a single mutex.
pub struct LruReplacer {
    list: Mutex<LruList>,
    capacity: usize,
}

impl LruReplacer {
    /// Create a replacer able to track up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: Mutex::new(LruList::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Replacer for LruReplacer {
    fn unpin(&self, frame_id: FrameId) -> Result<()> {
        let mut list = self.list.lock();
        if list.links.contains_key(&frame_id) {
            return Ok(());
        }
        if list.links.len() >= self.capacity {
            return Err(Error::ExceedMaxCap(self.capacity));
        }
        list.push_front(frame_id);
        Ok(())
    }

    fn pin(&self, frame_id: FrameId) {
        self.list.lock().remove(frame_id);
    }

    fn victim(&self) -> Option<FrameId> {
        let mut list = self.list.lock();
        let tail = list.tail?;
        list.remove(tail);
        Some(tail)
    }

    fn size(&self) -> usize {
        self.list.lock().links.len()
    }
}
