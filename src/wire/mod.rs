//! Generic, schema-less decoding of message bodies.
//!
//! Each body is a sequence of tagged fields. A tag is a varint whose low
//! three bits give the wire kind and whose remaining bits give the field
//! number:
//!
//! | Kind | Name | Payload |
//! |------|------|---------|
//! | 0 | Varint | base-128 varint |
//! | 1 | Fixed64 | 8 bytes, little-endian |
//! | 2 | `LengthDelimited` | varint length + bytes |
//! | 5 | Fixed32 | 4 bytes, little-endian |
//!
//! Group kinds (3, 4) and the undefined kinds (6, 7) are rejected. No
//! schema is needed: [`FieldTree::parse`] keeps every field, known or not,
//! and leaves length-delimited values for the caller to reinterpret.
//!
//! # Submodules
//!
//! - [`varint`] - varint encoding shared with the message framer
//! - [`value`] - [`WireValue`] and [`WireKind`]
//! - [`tree`] - [`FieldTree`], path lookups and re-encoding
//! - [`builder`] - [`MessageBuilder`] for writing messages
//! - [`json`] - JSON rendering

pub mod builder;
pub mod json;
pub mod tree;
pub mod value;
pub mod varint;

pub use builder::MessageBuilder;
pub use tree::{FieldTree, MAX_FIELD_NUMBER};
pub use value::{WireKind, WireValue};

/// Reinterprets a raw 64-bit value as a signed fixed-point coordinate.
///
/// Coordinates are stored as two's-complement integers with 16 fractional
/// bits.
///
/// ```
/// use sgreplay_parser::wire::fixed_to_world;
///
/// let x = fixed_to_world(18_446_744_073_557_508_096);
/// assert!((x - -2320.0).abs() < 0.5);
/// ```
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
pub fn fixed_to_world(raw: u64) -> f64 {
    (raw as i64) as f64 / 65536.0
}
