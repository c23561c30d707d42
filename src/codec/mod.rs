//! Byte codecs: tuple layouts, KV keys and row identifiers.

pub mod key;
mod object_id;
mod tuple;

pub use key::IndexEntry;
pub use object_id::{ObjectId, OBJECT_ID_LEN};
pub use tuple::{Tuple, TupleLayout, SMALL_TUPLE_MAX_ELEMENTS, TUPLE_HEADER_SIZE};
