//! Individual wire values.

use std::borrow::Cow;

use serde::Serialize;

use super::tree::FieldTree;
use crate::error::WireFormatError;

/// The four wire kinds the walker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireKind {
    /// Kind 0: base-128 varint.
    Varint,
    /// Kind 1: 8 little-endian bytes.
    Fixed64,
    /// Kind 2: varint length followed by that many bytes.
    LengthDelimited,
    /// Kind 5: 4 little-endian bytes.
    Fixed32,
}

impl WireKind {
    /// Maps the low three tag bits to a kind.
    ///
    /// Returns `None` for the group kinds (3, 4) and the undefined kinds
    /// (6, 7).
    #[must_use]
    pub const fn from_tag_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(WireKind::Varint),
            1 => Some(WireKind::Fixed64),
            2 => Some(WireKind::LengthDelimited),
            5 => Some(WireKind::Fixed32),
            _ => None,
        }
    }

    /// Returns the low three tag bits for this kind.
    #[must_use]
    pub const fn tag_bits(self) -> u8 {
        match self {
            WireKind::Varint => 0,
            WireKind::Fixed64 => 1,
            WireKind::LengthDelimited => 2,
            WireKind::Fixed32 => 5,
        }
    }
}

/// One decoded field value.
///
/// Length-delimited values stay raw bytes; whether they hold text, a nested
/// message, or opaque data is decided by the caller through [`as_str`],
/// [`as_message`] or [`as_bytes`].
///
/// [`as_str`]: WireValue::as_str
/// [`as_message`]: WireValue::as_message
/// [`as_bytes`]: WireValue::as_bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue<'a> {
    /// A varint value.
    Varint(u64),
    /// A 64-bit fixed value.
    Fixed64(u64),
    /// A length-delimited byte range.
    LengthDelimited(Cow<'a, [u8]>),
    /// A 32-bit fixed value.
    Fixed32(u32),
}

impl<'a> WireValue<'a> {
    /// Returns the wire kind of this value.
    #[must_use]
    pub fn kind(&self) -> WireKind {
        match self {
            WireValue::Varint(_) => WireKind::Varint,
            WireValue::Fixed64(_) => WireKind::Fixed64,
            WireValue::LengthDelimited(_) => WireKind::LengthDelimited,
            WireValue::Fixed32(_) => WireKind::Fixed32,
        }
    }

    /// Returns the numeric value of a varint or fixed value.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            WireValue::Varint(v) | WireValue::Fixed64(v) => Some(*v),
            WireValue::Fixed32(v) => Some(u64::from(*v)),
            WireValue::LengthDelimited(_) => None,
        }
    }

    /// Returns the numeric value only if it fits in a `u32`.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    /// Returns the raw bytes of a length-delimited value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WireValue::LengthDelimited(bytes) => Some(&**bytes),
            _ => None,
        }
    }

    /// Interprets a length-delimited value as UTF-8 text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Interprets a length-delimited value as a nested message.
    ///
    /// Returns `None` for other kinds and for bytes that do not parse.
    #[must_use]
    pub fn as_message(&self) -> Option<FieldTree<'_>> {
        self.as_bytes().and_then(|b| FieldTree::parse(b).ok())
    }

    /// Interprets a length-delimited value as a nested message, reporting
    /// why the bytes do not parse.
    ///
    /// Returns `None` for values that are not length-delimited.
    pub fn try_message(&self) -> Option<Result<FieldTree<'_>, WireFormatError>> {
        self.as_bytes().map(FieldTree::parse)
    }

    /// Detaches the value from the buffer it was decoded from.
    #[must_use]
    pub fn into_owned(self) -> WireValue<'static> {
        match self {
            WireValue::Varint(v) => WireValue::Varint(v),
            WireValue::Fixed64(v) => WireValue::Fixed64(v),
            WireValue::LengthDelimited(bytes) => {
                WireValue::LengthDelimited(Cow::Owned(bytes.into_owned()))
            }
            WireValue::Fixed32(v) => WireValue::Fixed32(v),
        }
    }
}
