//! Lock-free LIFO free list of frames.
//!
//! The stack is threaded through [`BufferFrame::next_free`]; the head is a
//! single atomic word and every operation is one compare-and-swap.
//!
//! # ABA
//! A plain index head is exposed to ABA: a popper reads `head = A, next = B`,
//! another thread pops A and B and pushes A back, and the first CAS then
//! installs B although B is in use. Frames are never deallocated while the
//! pool lives, so a stale read is always of valid memory, but the lost-update
//! would still corrupt the list. The head therefore packs a 32-bit version
//! tag next to the 32-bit frame index; every successful CAS bumps the tag, so
//! a head that was popped and pushed back no longer compares equal.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::buffer::frame::BufferFrame;
use crate::common::FrameId;

const NIL: u32 = u32::MAX;

#[inline]
fn pack(tag: u32, index: u32) -> u64 {
    ((tag as u64) << 32) | index as u64
}

#[inline]
fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// Lock-free FILO stack of free frames for one partition.
pub struct FreeList {
    head: AtomicU64,
    /// Advisory length: bumped before a push is published and dropped after
    /// a pop succeeds, so it never underflows but may briefly run high.
    counter: AtomicUsize,
}

impl FreeList {
    pub fn new() -> Self {
        Self {
            head: AtomicU64::new(pack(0, NIL)),
            counter: AtomicUsize::new(0),
        }
    }

    /// Pop the most recently pushed frame, or `None` if empty.
    pub fn pop(&self, frames: &[BufferFrame]) -> Option<FrameId> {
        let mut current = self.head.load(Ordering::Acquire);
        loop {
            let (tag, index) = unpack(current);
            if index == NIL {
                return None;
            }
            let next = frames[index as usize].next_free();
            let new = pack(tag.wrapping_add(1), next);
            match self
                .head
                .compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.counter.fetch_sub(1, Ordering::AcqRel);
                    frames[index as usize].set_next_free(NIL);
                    return Some(FrameId::new(index as usize));
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Push one frame.
    pub fn push(&self, frames: &[BufferFrame], frame: FrameId) {
        self.batch_push(frames, frame, frame, 1);
    }

    /// Splice a pre-linked chain `head ..= tail` of `count` frames in one CAS.
    ///
    /// The chain must already be linked through `next_free` from `head` to
    /// `tail`; `tail`'s link is overwritten.
    pub fn batch_push(&self, frames: &[BufferFrame], head: FrameId, tail: FrameId, count: usize) {
        debug_assert!(head.0 < NIL as usize && tail.0 < NIL as usize);
        self.counter.fetch_add(count, Ordering::AcqRel);

        let mut current = self.head.load(Ordering::Acquire);
        loop {
            let (tag, index) = unpack(current);
            frames[tail.0].set_next_free(index);
            let new = pack(tag.wrapping_add(1), head.0 as u32);
            match self
                .head
                .compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Link `chain` through `next_free` and push it in one CAS.
    pub fn push_chain(&self, frames: &[BufferFrame], chain: &[FrameId]) {
        let (Some(&head), Some(&tail)) = (chain.first(), chain.last()) else {
            return;
        };
        for pair in chain.windows(2) {
            frames[pair[0].0].set_next_free(pair[1].0 as u32);
        }
        self.batch_push(frames, head, tail, chain.len());
    }

    /// Advisory number of frames on the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.counter.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        unpack(self.head.load(Ordering::Acquire)).1 == NIL
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn frames(n: usize) -> Vec<BufferFrame> {
        (0..n).map(|_| BufferFrame::new()).collect()
    }

    #[test]
    fn test_lifo_order() {
        let frames = frames(3);
        let list = FreeList::new();

        list.push(&frames, FrameId::new(0));
        list.push(&frames, FrameId::new(1));
        list.push(&frames, FrameId::new(2));
        assert_eq!(list.len(), 3);

        assert_eq!(list.pop(&frames), Some(FrameId::new(2)));
        assert_eq!(list.pop(&frames), Some(FrameId::new(1)));
        assert_eq!(list.pop(&frames), Some(FrameId::new(0)));
        assert_eq!(list.pop(&frames), None);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_push_chain() {
        let frames = frames(5);
        let list = FreeList::new();
        list.push(&frames, FrameId::new(4));

        list.push_chain(&frames, &[FrameId::new(0), FrameId::new(1), FrameId::new(2)]);
        assert_eq!(list.len(), 4);

        let popped: Vec<_> = std::iter::from_fn(|| list.pop(&frames)).map(|f| f.0).collect();
        assert_eq!(popped, vec![0, 1, 2, 4]);
    }

    #[test]
    fn test_push_empty_chain_is_noop() {
        let frames = frames(1);
        let list = FreeList::new();
        list.push_chain(&frames, &[]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_concurrent_pop_push_conserves_frames() {
        const N: usize = 64;
        let frames = Arc::new(frames(N));
        let list = Arc::new(FreeList::new());
        let all: Vec<_> = (0..N).map(FrameId::new).collect();
        list.push_chain(&frames, &all);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frames = Arc::clone(&frames);
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if let Some(frame) = list.pop(&frames) {
                            list.push(&frames, frame);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = HashSet::new();
        while let Some(frame) = list.pop(&frames) {
            assert!(seen.insert(frame), "frame {} popped twice", frame);
        }
        assert_eq!(seen.len(), N);
        assert_eq!(list.len(), 0);
    }
}
