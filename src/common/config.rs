//! Configuration constants and runtime knobs for policydb.

use std::time::Duration;

use crate::common::error::{Error, Result};

/// Size of a page in bytes (16KB).
///
/// Both the on-disk unit and the in-memory frame size. Page `pid` lives at
/// file offset `pid × PAGE_SIZE`.
pub const PAGE_SIZE: usize = 16 * 1024;

/// Size of the header at the start of every page.
///
/// # Layout
/// - GSN (8 bytes)
/// - data-structure type tag + checksum (4 + 4 bytes)
/// - debug tag (8 bytes)
pub const PAGE_HEADER_SIZE: usize = 24;

/// Bytes available to callers after the header.
pub const PAGE_DATA_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// Runtime configuration for a [`BufferPool`](crate::buffer::BufferPool).
///
/// The frame count is `dram_bytes / PAGE_SIZE + safety_pages`. Partition
/// count is `2^partition_bits`.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// DRAM budget for page frames.
    pub dram_bytes: usize,
    /// Extra frames mapped on top of the DRAM budget.
    pub safety_pages: usize,
    /// log2 of the partition count.
    pub partition_bits: u32,
    /// Free-list low-water mark, in percent of the partition's frames.
    pub free_pct: usize,
    /// Cooling queue upper bound, in percent of the partition's frames.
    pub cool_pct: usize,
    /// Spawn a background thread running the cooling walker.
    pub background_cooling: bool,
    /// How long the walker sleeps between passes when nobody signals it.
    pub cooling_interval: Duration,
}

impl BufferPoolConfig {
    /// A single-partition pool with exactly `frames` frames.
    ///
    /// Background cooling is off so that eviction only happens on demand.
    pub fn with_frames(frames: usize) -> Self {
        Self {
            dram_bytes: frames * PAGE_SIZE,
            safety_pages: 0,
            partition_bits: 0,
            background_cooling: false,
            ..Self::default()
        }
    }

    /// Total number of frames backed by the anonymous mapping.
    pub fn frame_count(&self) -> usize {
        self.dram_bytes / PAGE_SIZE + self.safety_pages
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        1usize << self.partition_bits
    }

    pub fn validate(&self) -> Result<()> {
        let frames = self.frame_count();
        if frames == 0 {
            return Err(Error::InvalidConfig("buffer pool needs at least one frame".into()));
        }
        if self.partition_bits > 16 {
            return Err(Error::InvalidConfig(format!(
                "partition_bits {} is too large",
                self.partition_bits
            )));
        }
        if frames < self.partition_count() {
            return Err(Error::InvalidConfig(format!(
                "{} frames cannot fill {} partitions",
                frames,
                self.partition_count()
            )));
        }
        if self.free_pct > 100 || self.cool_pct > 100 {
            return Err(Error::InvalidConfig("percentages must be within 0..=100".into()));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            dram_bytes: 64 * 1024 * 1024,
            safety_pages: 10,
            partition_bits: 3,
            free_pct: 1,
            cool_pct: 10,
            background_cooling: true,
            cooling_interval: Duration::from_millis(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 16384);
        assert_eq!(PAGE_DATA_SIZE, 16384 - 24);
    }

    #[test]
    fn test_with_frames() {
        let config = BufferPoolConfig::with_frames(3);
        assert_eq!(config.frame_count(), 3);
        assert_eq!(config.partition_count(), 1);
        assert!(!config.background_cooling);
        config.validate().unwrap();
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.partition_count(), 8);
        assert_eq!(config.frame_count(), 4096 + 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let config = BufferPoolConfig {
            dram_bytes: 0,
            safety_pages: 0,
            ..BufferPoolConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_more_partitions_than_frames() {
        let config = BufferPoolConfig {
            partition_bits: 4,
            ..BufferPoolConfig::with_frames(3)
        };
        assert!(config.validate().is_err());
    }
}
