//! Session and transaction state.

mod context;
mod watermark;

pub use context::SessionContext;
pub use watermark::WaterMark;
