//! Page types and layout.
//!
//! This module contains:
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`PageType`] - Discriminator for different page formats
//! - [`SlottedPage`] - Variable-length value layout over a page body

mod page_header;
mod slotted;

pub use page_header::{PageHeader, PageType};
pub use slotted::SlottedPage;
