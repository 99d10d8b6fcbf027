//! Error types for the SGReplay parser.
//!
//! Each pipeline stage owns its own error enum so callers can tell apart a
//! file that is not a replay at all ([`FormatError`]), a damaged compressed
//! stream ([`DecompressionError`]), a corrupt length prefix that ends message
//! iteration ([`FramingError`]), and a single undecodable message
//! ([`WireFormatError`]) that only costs that one message.
//!
//! [`ParserError`] aggregates all of them for the top-level entry points.

use thiserror::Error;

/// The main error type for SGReplay parsing operations.
///
/// # Example
///
/// ```
/// use sgreplay_parser::error::{FormatError, ParserError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(FormatError::BadMagic {
///         expected: 0xE3B0_A49D,
///         found: 0,
///     }
///     .into())
/// }
///
/// assert!(matches!(example_operation(), Err(ParserError::Format(_))));
/// ```
#[derive(Error, Debug)]
pub enum ParserError {
    /// An I/O error occurred while reading a replay or asset file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The container header is not a supported replay header.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The compressed stream could not be inflated.
    #[error(transparent)]
    Decompression(#[from] DecompressionError),

    /// The inflated buffer could not be split into messages.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// A single message body is structurally invalid.
    #[error(transparent)]
    WireFormat(#[from] WireFormatError),

    /// The external asset table could not be loaded.
    #[error("Asset table error: {reason}")]
    Assets {
        /// A description of what went wrong.
        reason: String,
    },
}

impl ParserError {
    /// Returns whether this error only invalidates one message rather than
    /// the whole file.
    #[must_use]
    pub fn is_message_local(&self) -> bool {
        matches!(self, ParserError::WireFormat(_))
    }
}

/// Bounds-check failure raised by the low-level readers in [`crate::binary`].
///
/// Every stage converts this into its own `Truncated` variant.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unexpected end of data: expected {expected} bytes, but only {available} available")]
pub struct UnexpectedEof {
    /// The number of bytes that were needed.
    pub expected: usize,
    /// The number of bytes actually available.
    pub available: usize,
}

impl UnexpectedEof {
    /// Creates an `UnexpectedEof` with the given sizes.
    #[must_use]
    pub fn new(expected: usize, available: usize) -> Self {
        UnexpectedEof {
            expected,
            available,
        }
    }
}

/// Container header failures. Fatal: the file is not a replay, or comes
/// from an incompatible format epoch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The first four bytes do not hold the replay magic.
    #[error("Invalid magic: expected 0x{expected:08X}, found 0x{found:08X}")]
    BadMagic {
        /// The magic every replay must carry.
        expected: u32,
        /// The value read from the file.
        found: u32,
    },

    /// The header version lies outside the supported range.
    #[error("Unsupported replay version {version} (supported {min}..={max})")]
    UnsupportedVersion {
        /// The version read from the file.
        version: u32,
        /// Lowest supported version.
        min: u32,
        /// Highest supported version.
        max: u32,
    },

    /// The file is too short for its header or declared data offset.
    #[error("Truncated container: expected {expected} bytes, but only {available} available")]
    Truncated {
        /// The number of bytes the header requires.
        expected: usize,
        /// The number of bytes in the file.
        available: usize,
    },
}

impl From<UnexpectedEof> for FormatError {
    fn from(e: UnexpectedEof) -> Self {
        FormatError::Truncated {
            expected: e.expected,
            available: e.available,
        }
    }
}

/// Compressed-stream failures. Fatal for the file, never for a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressionError {
    /// The gzip-style header in front of the deflate body is malformed.
    #[error("Invalid gzip header: {reason}")]
    InvalidHeader {
        /// A description of the header problem.
        reason: String,
    },

    /// The deflate body is corrupt.
    #[error("Invalid deflate stream after {consumed} input bytes: {reason}")]
    Invalid {
        /// Compressed bytes consumed before the failure.
        consumed: usize,
        /// The inflater's message.
        reason: String,
    },

    /// The input ended before the deflate stream (or the gzip header) did.
    ///
    /// Distinct from [`DecompressionError::Invalid`] so callers can report
    /// partially captured files separately from corruption.
    #[error("Truncated compressed stream: consumed {consumed} of {available} bytes, produced {produced} bytes")]
    Truncated {
        /// Compressed bytes consumed.
        consumed: usize,
        /// Compressed bytes available.
        available: usize,
        /// Bytes inflated before the input ran out.
        produced: usize,
    },
}

impl From<UnexpectedEof> for DecompressionError {
    fn from(e: UnexpectedEof) -> Self {
        DecompressionError::Truncated {
            consumed: e.available,
            available: e.available,
            produced: 0,
        }
    }
}

/// Message framing failures. Fatal for the remainder of the file only;
/// frames already produced stay usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// A length prefix kept its continuation bit through ten bytes.
    #[error("Length prefix at offset {offset} exceeds 10 bytes")]
    VarintTooLong {
        /// Offset of the length prefix.
        offset: usize,
    },

    /// A declared length (or the prefix itself) runs past the buffer.
    #[error("Truncated frame at offset {offset}: declared {declared} bytes, {available} available")]
    Truncated {
        /// Offset of the length prefix.
        offset: usize,
        /// Declared body length (0 when the prefix itself was cut off).
        declared: u64,
        /// Bytes remaining after the prefix.
        available: usize,
    },
}

/// Structural failures inside one message body. The framer has already
/// isolated message boundaries, so the message is skipped and decoding
/// continues with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireFormatError {
    /// The tag's wire kind is not one of 0, 1, 2 or 5.
    #[error("Invalid wire kind {kind} for field {field_number} at offset {offset}")]
    InvalidWireKind {
        /// The low three bits of the tag.
        kind: u8,
        /// The field number carried by the tag.
        field_number: u64,
        /// Offset of the tag within the message.
        offset: usize,
    },

    /// The tag's field number is zero or exceeds 2^29 - 1.
    #[error("Invalid field number {field_number} at offset {offset}")]
    InvalidFieldNumber {
        /// The decoded field number.
        field_number: u64,
        /// Offset of the tag within the message.
        offset: usize,
    },

    /// A varint kept its continuation bit through ten bytes.
    #[error("Varint at offset {offset} exceeds 10 bytes")]
    VarintTooLong {
        /// Offset of the varint within the message.
        offset: usize,
    },

    /// A value runs past the end of the message.
    #[error("Truncated value at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Offset of the value within the message.
        offset: usize,
        /// Bytes the value needs.
        needed: usize,
        /// Bytes left in the message.
        available: usize,
    },
}

/// A specialized Result type for SGReplay parsing operations.
pub type Result<T> = std::result::Result<T, ParserError>;
