//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`] containing metadata:
//! - GSN of the last modification
//! - [`PageType`] (data-structure-type tag)
//! - CRC32 checksum for integrity
//! - debug tag

use crate::common::config::PAGE_HEADER_SIZE;
use crate::common::{Error, Result};

/// Data-structure type stored in a page.
///
/// Stored as a `u32` in the header.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized page or page on the free list.
    #[default]
    Free = 0,
    /// Generic slotted data page.
    Data = 1,
    /// Index page.
    Index = 2,
    /// Database metadata.
    Meta = 3,
}

impl PageType {
    /// Convert from u32, returning `Free` for unknown values.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => PageType::Data,
            2 => PageType::Index,
            3 => PageType::Meta,
            _ => PageType::Free,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (24 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     gsn (global serial number, little-endian)
/// 8       4     dt_type (PageType as u32)
/// 12      4     checksum (CRC32, little-endian)
/// 16      8     debug_tag
/// ```
///
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero. A page whose stored checksum is zero has never been
/// stamped and is accepted as-is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// GSN of the last write to this page.
    pub gsn: u64,
    /// Type of this page.
    pub page_type: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
    /// Free-form tag for debugging (usually the owning PID).
    pub debug_tag: u64,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = PAGE_HEADER_SIZE;

    pub const OFFSET_GSN: usize = 0;
    pub const OFFSET_PAGE_TYPE: usize = 8;
    pub const OFFSET_CHECKSUM: usize = 12;
    pub const OFFSET_DEBUG_TAG: usize = 16;

    /// Create a new header with the given page type and GSN zero.
    pub fn new(page_type: PageType) -> Self {
        Self {
            gsn: 0,
            page_type,
            checksum: 0,
            debug_tag: 0,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        Self {
            gsn: read_u64(data, Self::OFFSET_GSN),
            page_type: PageType::from_u32(read_u32(data, Self::OFFSET_PAGE_TYPE)),
            checksum: read_u32(data, Self::OFFSET_CHECKSUM),
            debug_tag: read_u64(data, Self::OFFSET_DEBUG_TAG),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_GSN..Self::OFFSET_GSN + 8].copy_from_slice(&self.gsn.to_le_bytes());
        data[Self::OFFSET_PAGE_TYPE..Self::OFFSET_PAGE_TYPE + 4]
            .copy_from_slice(&(self.page_type as u32).to_le_bytes());
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_DEBUG_TAG..Self::OFFSET_DEBUG_TAG + 8]
            .copy_from_slice(&self.debug_tag.to_le_bytes());
    }

    /// Compute the CRC32 checksum of a full page, skipping the checksum field.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Stamp the checksum of `page_data` into its own header.
    pub fn stamp_checksum(page_data: &mut [u8]) {
        let checksum = Self::compute_checksum(page_data);
        page_data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the checksum stored in `page_data`.
    ///
    /// Unstamped pages (checksum zero) pass.
    pub fn verify(page_data: &[u8]) -> Result<()> {
        let stored = read_u32(page_data, Self::OFFSET_CHECKSUM);
        if stored == 0 {
            return Ok(());
        }
        let computed = Self::compute_checksum(page_data);
        if stored != computed {
            return Err(Error::Corrupted(format!(
                "page checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            )));
        }
        Ok(())
    }

    /// Read only the GSN field.
    #[inline]
    pub fn read_gsn(data: &[u8]) -> u64 {
        read_u64(data, Self::OFFSET_GSN)
    }

    /// Overwrite only the GSN field.
    #[inline]
    pub fn write_gsn(data: &mut [u8], gsn: u64) {
        data[Self::OFFSET_GSN..Self::OFFSET_GSN + 8].copy_from_slice(&gsn.to_le_bytes());
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PAGE_SIZE;

    #[test]
    fn test_page_type_from_u32() {
        assert_eq!(PageType::from_u32(0), PageType::Free);
        assert_eq!(PageType::from_u32(1), PageType::Data);
        assert_eq!(PageType::from_u32(2), PageType::Index);
        assert_eq!(PageType::from_u32(3), PageType::Meta);
        assert_eq!(PageType::from_u32(999), PageType::Free);
    }

    #[test]
    fn test_page_header_roundtrip() {
        let original = PageHeader {
            gsn: 0x1122_3344_5566_7788,
            page_type: PageType::Index,
            checksum: 0xDEADBEEF,
            debug_tag: 7,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        original.write_to(&mut buffer);

        assert_eq!(PageHeader::from_bytes(&buffer), original);
    }

    #[test]
    fn test_page_header_byte_layout() {
        let header = PageHeader {
            gsn: 0x0807060504030201,
            page_type: PageType::Data,
            checksum: 0,
            debug_tag: 0,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 0x01);
        assert_eq!(buffer[7], 0x08);
        assert_eq!(buffer[8], 1);
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut page_data = vec![0u8; PAGE_SIZE];
        page_data[100] = 0xAB;

        let checksum1 = PageHeader::compute_checksum(&page_data);
        page_data[12..16].copy_from_slice(&[0xFF; 4]);
        let checksum2 = PageHeader::compute_checksum(&page_data);

        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_stamp_and_verify() {
        let mut page_data = vec![0u8; PAGE_SIZE];
        page_data[1000] = 0xCD;
        PageHeader::stamp_checksum(&mut page_data);
        PageHeader::verify(&page_data).unwrap();

        page_data[1000] = 0xCE;
        assert!(matches!(PageHeader::verify(&page_data), Err(Error::Corrupted(_))));
    }

    #[test]
    fn test_unstamped_page_verifies() {
        let page_data = vec![0u8; PAGE_SIZE];
        PageHeader::verify(&page_data).unwrap();
    }

    #[test]
    fn test_gsn_accessors() {
        let mut page_data = vec![0u8; PAGE_SIZE];
        PageHeader::write_gsn(&mut page_data, 99);
        assert_eq!(PageHeader::read_gsn(&page_data), 99);
        assert_eq!(PageHeader::from_bytes(&page_data).gsn, 99);
    }
}
