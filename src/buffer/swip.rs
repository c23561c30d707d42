//! Swizzled page references.
//!
//! A [`Swip`] is a single 64-bit word that refers either to a resident frame
//! or to an on-disk page:
//!
//! ```text
//!  63                                   2   1   0
//! ┌──────────────────────────────────────┬───┬───┐
//! │ PID (evicted) / frame index (hot,cool)│ C │ E │
//! └──────────────────────────────────────┴───┴───┘
//! ```
//!
//! - `E` (bit 0): evicted, the payload is a PID
//! - `C` (bit 1): cool, the payload is a frame pending demotion
//! - neither: hot, the payload is a live frame
//!
//! Frames are addressed by arena index, not by pointer, so a stale swip can
//! at worst name the wrong frame; callers re-check the frame's PID under the
//! partition lock before trusting it.

use std::fmt;

use crate::common::{FrameId, PageId};

const EVICTED_BIT: u64 = 0b01;
const COOL_BIT: u64 = 0b10;
const TAG_MASK: u64 = 0b11;
const PAYLOAD_SHIFT: u32 = 2;

/// Tagged reference to a hot frame, a cool frame, or an evicted page.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swip(u64);

const _: () = assert!(std::mem::size_of::<Swip>() == 8);

impl Swip {
    /// Swip for a page that lives only on disk.
    ///
    /// # Panics
    /// Panics in debug builds if `pid` does not fit in 62 bits.
    #[inline]
    pub fn evicted(pid: PageId) -> Self {
        debug_assert!(pid.0 <= PageId::MAX.0, "pid {} does not fit in a swip", pid.0);
        Swip(EVICTED_BIT | (pid.0 << PAYLOAD_SHIFT))
    }

    /// Swip for a resident, hot frame.
    #[inline]
    pub fn hot(frame: FrameId) -> Self {
        Swip((frame.0 as u64) << PAYLOAD_SHIFT)
    }

    /// Rebuild a swip from its raw word. Returns `None` for the invalid tag
    /// combination (both bits set).
    pub fn from_raw(raw: u64) -> Option<Self> {
        if raw & TAG_MASK == TAG_MASK {
            None
        } else {
            Some(Swip(raw))
        }
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_hot(&self) -> bool {
        self.0 & TAG_MASK == 0
    }

    #[inline]
    pub fn is_cool(&self) -> bool {
        self.0 & TAG_MASK == COOL_BIT
    }

    #[inline]
    pub fn is_evicted(&self) -> bool {
        self.0 & TAG_MASK == EVICTED_BIT
    }

    /// True if the swip names a frame (hot or cool).
    #[inline]
    pub fn is_resident(&self) -> bool {
        !self.is_evicted()
    }

    /// Return a cool copy of a hot swip.
    #[inline]
    pub fn cooled(self) -> Self {
        debug_assert!(self.is_hot(), "only hot swips can be cooled");
        Swip(self.0 | COOL_BIT)
    }

    /// Return a hot copy of a cool or hot swip.
    #[inline]
    pub fn heated(self) -> Self {
        debug_assert!(self.is_resident(), "evicted swips must be loaded first");
        Swip(self.0 & !COOL_BIT)
    }

    /// PID of an evicted swip.
    #[inline]
    pub fn as_page_id(&self) -> Option<PageId> {
        self.is_evicted().then(|| PageId(self.0 >> PAYLOAD_SHIFT))
    }

    /// Frame of a hot or cool swip.
    #[inline]
    pub fn as_frame(&self) -> Option<FrameId> {
        self.is_resident()
            .then(|| FrameId((self.0 >> PAYLOAD_SHIFT) as usize))
    }
}

impl fmt::Debug for Swip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pid) = self.as_page_id() {
            write!(f, "Swip::Evicted({})", pid.0)
        } else if self.is_cool() {
            write!(f, "Swip::Cool({})", self.0 >> PAYLOAD_SHIFT)
        } else {
            write!(f, "Swip::Hot({})", self.0 >> PAYLOAD_SHIFT)
        }
    }
}
