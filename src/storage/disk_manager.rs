//! Disk Manager - page-granular file I/O.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages at `pid × PAGE_SIZE`
//! - Tracking the file size
//!
//! It does no buffering; the buffer pool owns the memory pages are read into.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (16KB)  │ (16KB)  │ (16KB)  │         │ (16KB)  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// # Thread Safety
/// All I/O is positioned (`pread`/`pwrite`), so `&self` methods can be called
/// from every buffer pool partition at once without a shared cursor.
///
/// # Durability
/// Every write is followed by `sync_data()`.
#[derive(Debug)]
pub struct DiskManager {
    file: File,
    /// Current file length in bytes.
    file_size: AtomicU64,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            file_size: AtomicU64::new(0),
        })
    }

    /// Open an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_size = file.metadata()?.len();

        Ok(Self {
            file,
            file_size: AtomicU64::new(file_size),
        })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read page `pid` into `buf`.
    ///
    /// A short read inside the file is logged and the rest of `buf` is zeroed.
    ///
    /// # Errors
    /// - `Error::IoReadExceedFileSize` if `(pid + 1) × PAGE_SIZE` is past EOF
    /// - `Error::Io` for any other failure
    pub fn read_page(&self, pid: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        let file_size = self.file_size();
        let offset = pid.file_offset(PAGE_SIZE);
        if offset + PAGE_SIZE as u64 > file_size {
            return Err(Error::IoReadExceedFileSize { pid, file_size });
        }

        let mut filled = 0;
        while filled < buf.len() {
            match read_at(&self.file, &mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < buf.len() {
            warn!(%pid, read = filled, expected = buf.len(), "partial page read");
            buf[filled..].fill(0);
        }
        Ok(())
    }

    /// Write `buf` as page `pid` and flush it to stable storage.
    pub fn write_page(&self, pid: PageId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        let offset = pid.file_offset(PAGE_SIZE);
        write_all_at(&self.file, buf, offset)?;
        self.file.sync_data()?;

        self.file_size
            .fetch_max(offset + buf.len() as u64, Ordering::AcqRel);
        Ok(())
    }

    /// Get the total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_size.load(Ordering::Acquire)
    }

    /// Number of whole pages in the file.
    #[inline]
    pub fn page_count(&self) -> u64 {
        self.file_size() / PAGE_SIZE as u64
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    while !buf.is_empty() {
        let n = std::os::windows::fs::FileExt::seek_write(file, buf, offset)?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    Ok(())
}
