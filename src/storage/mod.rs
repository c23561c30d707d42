//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Page-granular positioned file I/O
//! - [`page`] - Page header and slotted layout

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
