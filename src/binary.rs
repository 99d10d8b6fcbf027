//! Binary reading utilities for the container and gzip headers.
//!
//! This module provides functions for reading little-endian integers,
//! byte slices, and null-terminated strings from byte buffers. All
//! functions perform bounds checking and return [`UnexpectedEof`] for
//! truncated data; each pipeline stage maps that into its own error.
//!
//! # Endianness
//!
//! The SGReplay header and the gzip header both store multi-byte
//! integers little-endian. The functions in this module handle the
//! conversion automatically.
//!
//! # Example
//!
//! ```
//! use sgreplay_parser::binary::{read_cstring, read_u16_le, read_u32_le};
//!
//! let data = [0x9D, 0xA4, 0xB0, 0xE3, b'H', b'i', 0x00];
//!
//! assert_eq!(read_u16_le(&data, 0).unwrap(), 0xA49D);
//! assert_eq!(read_u32_le(&data, 0).unwrap(), 0xE3B0_A49D);
//!
//! let (s, consumed) = read_cstring(&data, 4).unwrap();
//! assert_eq!(s, "Hi");
//! assert_eq!(consumed, 3);
//! ```

use std::fmt::Write as _;

use crate::error::UnexpectedEof;

/// Result type for the low-level readers.
pub type ReadResult<T> = std::result::Result<T, UnexpectedEof>;

/// Reads a little-endian u16 value from the byte buffer at the given offset.
///
/// # Errors
///
/// Returns `UnexpectedEof` if the buffer doesn't contain at least 2 bytes
/// starting from the given offset.
///
/// # Example
///
/// ```
/// use sgreplay_parser::binary::read_u16_le;
///
/// let data = [0x34, 0x12, 0xFF, 0xFF];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 0xFFFF);
/// ```
pub fn read_u16_le(bytes: &[u8], offset: usize) -> ReadResult<u16> {
    let slice = read_bytes(bytes, offset, 2)?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

/// Reads a little-endian u32 value from the byte buffer at the given offset.
///
/// # Errors
///
/// Returns `UnexpectedEof` if the buffer doesn't contain at least 4 bytes
/// starting from the given offset.
///
/// # Example
///
/// ```
/// use sgreplay_parser::binary::read_u32_le;
///
/// let data = [0x78, 0x56, 0x34, 0x12];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0x12345678);
/// ```
pub fn read_u32_le(bytes: &[u8], offset: usize) -> ReadResult<u32> {
    let slice = read_bytes(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Reads a slice of bytes from the buffer at the given offset.
///
/// # Arguments
///
/// * `bytes` - The byte buffer to read from
/// * `offset` - The byte offset where the slice starts
/// * `len` - The number of bytes to read
///
/// # Errors
///
/// Returns `UnexpectedEof` if the buffer doesn't contain at least `len`
/// bytes starting from the given offset.
pub fn read_bytes(bytes: &[u8], offset: usize, len: usize) -> ReadResult<&[u8]> {
    let end = offset.saturating_add(len);
    if end > bytes.len() {
        return Err(UnexpectedEof::new(end, bytes.len()));
    }

    Ok(&bytes[offset..end])
}

/// Reads a null-terminated string starting at `offset`.
///
/// Returns the decoded text (invalid UTF-8 is replaced, gzip stores these
/// fields in ISO 8859-1) and the number of bytes consumed including the
/// terminator.
///
/// # Errors
///
/// Returns `UnexpectedEof` if no terminator is found before the end of the
/// buffer.
pub fn read_cstring(bytes: &[u8], offset: usize) -> ReadResult<(String, usize)> {
    let rest = bytes.get(offset..).unwrap_or(&[]);
    let Some(nul) = rest.iter().position(|&b| b == 0) else {
        return Err(UnexpectedEof::new(bytes.len() + 1, bytes.len()));
    };

    let text = String::from_utf8_lossy(&rest[..nul]).into_owned();
    Ok((text, nul + 1))
}

/// Renders bytes as lowercase hex without separators.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
