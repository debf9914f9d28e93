//! Struct dissection
//!
//! Reconstructs likely struct layouts from raw bytes. A [`Dissection`] owns a
//! tree of [`Field`]s; pointer fields expand lazily into the memory they point
//! at, so cyclic structures are only followed as far as the caller expands
//! them.

pub mod dissection;
pub mod explore;
pub mod field;
pub mod rtti;
pub mod value;

pub use dissection::Dissection;
pub use explore::{classify_bytes, explore_address, is_printable, Explorer, DEFAULT_WINDOW_SIZE};
pub use field::Field;
pub use rtti::{demangle, rtti_name};
pub use value::{parse_field_value, FieldType, FieldValue};
