//! Row identifiers.
//!
//! # Layout
//! ```text
//!  0        4              9         12        16
//! ┌────────┬──────────────┬─────────┬─────────┐
//! │ secs BE│ machine (5B) │ ctr BE  │ 0 pad   │
//! └────────┴──────────────┴─────────┴─────────┘
//! ```
//!
//! 96 significant bits (timestamp, per-process random machine bytes and a
//! wrapping counter), padded to 16 bytes so row keys have a fixed width.
//! Ids minted by one process in the same second sort in minting order until
//! the 24-bit counter wraps.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::common::{Error, Result};

/// Encoded width of an [`ObjectId`].
pub const OBJECT_ID_LEN: usize = 16;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

fn machine_bytes() -> &'static [u8; 5] {
    static MACHINE: OnceLock<[u8; 5]> = OnceLock::new();
    MACHINE.get_or_init(|| {
        let mut bytes = [0u8; 5];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::thread_rng().next_u32() & COUNTER_MASK))
        .fetch_add(1, Ordering::Relaxed)
        & COUNTER_MASK
}

impl ObjectId {
    /// The all-zero id.
    pub const EMPTY: ObjectId = ObjectId([0; OBJECT_ID_LEN]);

    /// Mint a fresh id.
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as u32);
        Self::from_parts(secs, *machine_bytes(), next_counter())
    }

    /// Assemble an id from its parts; only the low 24 bits of `counter` are
    /// kept.
    pub fn from_parts(secs: u32, machine: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&machine);
        bytes[9..12].copy_from_slice(&(counter & COUNTER_MASK).to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Parse from exactly [`OBJECT_ID_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; OBJECT_ID_LEN] = bytes.try_into().map_err(|_| {
            Error::Corrupted(format!(
                "object id needs {} bytes, got {}",
                OBJECT_ID_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([0, self.0[9], self.0[10], self.0[11]])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..12] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}
