//! Column statistics.
//!
//! - [`CmSketch`] - Count-min sketch for frequency estimation

mod cm_sketch;

pub use cm_sketch::CmSketch;
