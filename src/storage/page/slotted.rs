//! Slotted-page layout over a page body.
//!
//! ```text
//! +-----------+-----------+------------------+-------------+------------+
//! | slots u16 | end u16   | slot[0..n] (4B)  | free space  | values ... |
//! +-----------+-----------+------------------+-------------+------------+
//! 0           2           4                                     body end
//! ```
//!
//! Each slot is `(offset u16, len u16)`. Values grow backward from the end of
//! the body. A slot with `len == 0` is a tombstone; empty values are rejected
//! on insert so the encoding is unambiguous.

use crate::common::{Error, Result};

const OFFSET_SLOT_COUNT: usize = 0;
const OFFSET_DATA_END: usize = 2;
const SLOTS_START: usize = 4;
const SLOT_SIZE: usize = 4;

/// View of a page body as a slotted page.
pub struct SlottedPage<B> {
    body: B,
}

impl<B: AsRef<[u8]>> SlottedPage<B> {
    pub fn new(body: B) -> Self {
        Self { body }
    }

    pub fn slot_count(&self) -> u16 {
        self.read_u16(OFFSET_SLOT_COUNT)
    }

    fn data_end(&self) -> usize {
        match self.read_u16(OFFSET_DATA_END) {
            0 => self.body.as_ref().len(),
            end => end as usize,
        }
    }

    /// Bytes left for one more value plus its slot.
    pub fn free_space(&self) -> usize {
        let slots_end = SLOTS_START + self.slot_count() as usize * SLOT_SIZE;
        self.data_end().saturating_sub(slots_end + SLOT_SIZE)
    }

    /// Value stored in `slot`, or `None` if out of range or deleted.
    pub fn get(&self, slot: u16) -> Option<&[u8]> {
        if slot >= self.slot_count() {
            return None;
        }
        let (offset, len) = self.slot(slot);
        if len == 0 {
            return None;
        }
        self.body.as_ref().get(offset..offset + len)
    }

    /// Iterate live `(slot, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &[u8])> + '_ {
        (0..self.slot_count()).filter_map(move |slot| self.get(slot).map(|v| (slot, v)))
    }

    fn slot(&self, slot: u16) -> (usize, usize) {
        let at = SLOTS_START + slot as usize * SLOT_SIZE;
        (self.read_u16(at) as usize, self.read_u16(at + 2) as usize)
    }

    fn read_u16(&self, at: usize) -> u16 {
        let body = self.body.as_ref();
        u16::from_le_bytes([body[at], body[at + 1]])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<B> {
    /// Reset the body to an empty slotted page.
    pub fn init(&mut self) {
        self.write_u16(OFFSET_SLOT_COUNT, 0);
        self.write_u16(OFFSET_DATA_END, 0);
    }

    /// Append `value` and return its slot.
    ///
    /// # Errors
    /// - `Error::ZeroSizeData` for an empty value
    /// - `Error::OutOfSpace` if value plus slot do not fit
    pub fn insert(&mut self, value: &[u8]) -> Result<u16> {
        if value.is_empty() {
            return Err(Error::ZeroSizeData);
        }
        let available = self.free_space();
        if value.len() > available || self.slot_count() == u16::MAX {
            return Err(Error::OutOfSpace {
                needed: value.len() + SLOT_SIZE,
                available,
            });
        }

        let slot = self.slot_count();
        let offset = self.data_end() - value.len();
        self.body.as_mut()[offset..offset + value.len()].copy_from_slice(value);

        let at = SLOTS_START + slot as usize * SLOT_SIZE;
        self.write_u16(at, offset as u16);
        self.write_u16(at + 2, value.len() as u16);
        self.write_u16(OFFSET_SLOT_COUNT, slot + 1);
        self.write_u16(OFFSET_DATA_END, offset as u16);
        Ok(slot)
    }

    /// Tombstone `slot`. Space is not compacted. Returns false if the slot was
    /// already empty or out of range.
    pub fn delete(&mut self, slot: u16) -> bool {
        if self.get(slot).is_none() {
            return false;
        }
        let at = SLOTS_START + slot as usize * SLOT_SIZE;
        self.write_u16(at + 2, 0);
        true
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.body.as_mut()[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }
}
