//! A small writer for wire-format messages.
//!
//! Used to re-emit field trees and to build synthetic replays.
//!
//! ```
//! use sgreplay_parser::wire::{FieldTree, MessageBuilder};
//!
//! let bytes = MessageBuilder::new()
//!     .varint(1, 13_796)
//!     .message(3, MessageBuilder::new().string(2, "DesolateTemple"))
//!     .build();
//!
//! let tree = FieldTree::parse(&bytes).unwrap();
//! assert_eq!(tree.varint(1), Some(13_796));
//! assert_eq!(tree.string_at(&[3, 2]).as_deref(), Some("DesolateTemple"));
//! ```

use super::tree::encode_tag;
use super::value::WireKind;
use super::varint::encode_varint;

/// Builds a message field by field, in call order.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a varint field.
    #[must_use]
    pub fn varint(mut self, field: u32, value: u64) -> Self {
        encode_tag(field, WireKind::Varint, &mut self.buf);
        encode_varint(value, &mut self.buf);
        self
    }

    /// Appends a signed value as a two's-complement varint.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn signed(self, field: u32, value: i64) -> Self {
        self.varint(field, value as u64)
    }

    /// Appends a fixed 64-bit field.
    #[must_use]
    pub fn fixed64(mut self, field: u32, value: u64) -> Self {
        encode_tag(field, WireKind::Fixed64, &mut self.buf);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a fixed 32-bit field.
    #[must_use]
    pub fn fixed32(mut self, field: u32, value: u32) -> Self {
        encode_tag(field, WireKind::Fixed32, &mut self.buf);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a length-delimited field holding raw bytes.
    #[must_use]
    pub fn bytes(mut self, field: u32, value: &[u8]) -> Self {
        encode_tag(field, WireKind::LengthDelimited, &mut self.buf);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
        self
    }

    /// Appends a length-delimited field holding text.
    #[must_use]
    pub fn string(self, field: u32, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    /// Appends a nested message.
    #[must_use]
    pub fn message(self, field: u32, message: MessageBuilder) -> Self {
        self.bytes(field, &message.buf)
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_known_bytes() {
        let bytes = MessageBuilder::new().varint(1, 150).string(2, "hi").build();
        assert_eq!(bytes, vec![0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_signed_is_ten_bytes() {
        let bytes = MessageBuilder::new().signed(5, -152_043_520).build();
        // one tag byte plus a ten-byte varint
        assert_eq!(bytes.len(), 11);
    }

    #[test]
    fn test_empty_nested_message() {
        let bytes = MessageBuilder::new()
            .message(3, MessageBuilder::new())
            .build();
        assert_eq!(bytes, vec![0x1A, 0x00]);
    }
}
