//! Gzip member header parsing (RFC 1952).
//!
//! The replay stream is a single gzip member whose header length depends on
//! the flag byte, so it is walked field by field instead of assuming the
//! minimal 10-byte layout.
//!
//! # Header Layout
//!
//! | Offset | Size | Field | Description |
//! |--------|------|-------|-------------|
//! | 0x00 | 2 | `id` | 0x1F 0x8B |
//! | 0x02 | 1 | `cm` | Compression method, 8 = deflate |
//! | 0x03 | 1 | `flg` | FTEXT, FHCRC, FEXTRA, FNAME, FCOMMENT |
//! | 0x04 | 4 | `mtime` | Modification time |
//! | 0x08 | 1 | `xfl` | Extra flags |
//! | 0x09 | 1 | `os` | Operating system |
//! | ... | 2+n | `extra` | If FEXTRA: length-prefixed extra field |
//! | ... | n+1 | `name` | If FNAME: null-terminated file name |
//! | ... | n+1 | `comment` | If FCOMMENT: null-terminated comment |
//! | ... | 2 | `hcrc` | If FHCRC: CRC16 of the header |

use serde::Serialize;

use crate::binary::{read_bytes, read_cstring, read_u16_le, read_u32_le};
use crate::error::DecompressionError;

/// The two gzip identification bytes.
pub const GZIP_ID: [u8; 2] = [0x1F, 0x8B];

/// The deflate compression method.
pub const CM_DEFLATE: u8 = 8;

/// Size of the fixed part of the header.
pub const FIXED_HEADER_SIZE: usize = 10;

/// Text hint flag.
pub const FTEXT: u8 = 0x01;
/// Header CRC16 present.
pub const FHCRC: u8 = 0x02;
/// Extra field present.
pub const FEXTRA: u8 = 0x04;
/// File name present.
pub const FNAME: u8 = 0x08;
/// Comment present.
pub const FCOMMENT: u8 = 0x10;
/// Bits that must be zero.
pub const RESERVED_FLAGS: u8 = 0xE0;

/// A parsed gzip member header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GzipHeader {
    /// Raw flag byte.
    pub flags: u8,
    /// Modification time (Unix seconds, 0 if unset).
    pub mtime: u32,
    /// Extra flags byte.
    pub xfl: u8,
    /// Operating system byte.
    pub os: u8,
    /// Contents of the FEXTRA field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Vec<u8>>,
    /// Original file name from FNAME.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Comment from FCOMMENT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Header CRC16 from FHCRC (read, not verified).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_crc: Option<u16>,
    /// Total header length; the deflate body starts here.
    pub header_len: usize,
}

impl GzipHeader {
    /// Parses a gzip header from the start of `data`.
    ///
    /// # Errors
    ///
    /// - `DecompressionError::InvalidHeader` on wrong ID bytes, a compression
    ///   method other than deflate, or reserved flag bits
    /// - `DecompressionError::Truncated` if the data ends inside the header
    pub fn parse(data: &[u8]) -> Result<Self, DecompressionError> {
        let id = read_bytes(data, 0, 2)?;
        if id != GZIP_ID {
            return Err(DecompressionError::InvalidHeader {
                reason: format!("bad ID bytes {:02X} {:02X}", id[0], id[1]),
            });
        }

        let fixed = read_bytes(data, 0, FIXED_HEADER_SIZE)?;
        let cm = fixed[2];
        if cm != CM_DEFLATE {
            return Err(DecompressionError::InvalidHeader {
                reason: format!("unsupported compression method {cm}"),
            });
        }

        let flags = fixed[3];
        if flags & RESERVED_FLAGS != 0 {
            return Err(DecompressionError::InvalidHeader {
                reason: format!("reserved flag bits set (0x{flags:02X})"),
            });
        }

        let mtime = read_u32_le(data, 4)?;
        let xfl = fixed[8];
        let os = fixed[9];
        let mut offset = FIXED_HEADER_SIZE;

        let extra = if flags & FEXTRA != 0 {
            let xlen = read_u16_le(data, offset)? as usize;
            let bytes = read_bytes(data, offset + 2, xlen)?.to_vec();
            offset += 2 + xlen;
            Some(bytes)
        } else {
            None
        };

        let filename = if flags & FNAME != 0 {
            let (name, consumed) = read_cstring(data, offset)?;
            offset += consumed;
            Some(name)
        } else {
            None
        };

        let comment = if flags & FCOMMENT != 0 {
            let (text, consumed) = read_cstring(data, offset)?;
            offset += consumed;
            Some(text)
        } else {
            None
        };

        let header_crc = if flags & FHCRC != 0 {
            let crc = read_u16_le(data, offset)?;
            offset += 2;
            Some(crc)
        } else {
            None
        };

        Ok(GzipHeader {
            flags,
            mtime,
            xfl,
            os,
            extra,
            filename,
            comment,
            header_crc,
            header_len: offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a fixed header with the given flags.
    fn create_test_header(flags: u8) -> Vec<u8> {
        vec![0x1F, 0x8B, 0x08, flags, 0x78, 0x56, 0x34, 0x12, 0x00, 0x0B]
    }

    #[test]
    fn test_parse_minimal_header() {
        let header = GzipHeader::parse(&create_test_header(0)).unwrap();

        assert_eq!(header.header_len, 10);
        assert_eq!(header.mtime, 0x1234_5678);
        assert_eq!(header.os, 0x0B);
        assert!(header.filename.is_none());
        assert!(header.extra.is_none());
    }

    #[test]
    fn test_parse_all_optional_fields() {
        let mut data = create_test_header(FEXTRA | FNAME | FCOMMENT | FHCRC);
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(b"abc");
        data.extend_from_slice(b"match.SGReplay\x00");
        data.extend_from_slice(b"recorded\x00");
        data.extend_from_slice(&0xBEEFu16.to_le_bytes());
        data.extend_from_slice(&[0x03, 0x00]);

        let header = GzipHeader::parse(&data).unwrap();
        assert_eq!(header.extra.as_deref(), Some(&b"abc"[..]));
        assert_eq!(header.filename.as_deref(), Some("match.SGReplay"));
        assert_eq!(header.comment.as_deref(), Some("recorded"));
        assert_eq!(header.header_crc, Some(0xBEEF));
        assert_eq!(header.header_len, data.len() - 2);
    }

    #[test]
    fn test_parse_bad_id() {
        let mut data = create_test_header(0);
        data[1] = 0x8C;
        assert!(matches!(
            GzipHeader::parse(&data),
            Err(DecompressionError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_parse_bad_method() {
        let mut data = create_test_header(0);
        data[2] = 7;
        let err = GzipHeader::parse(&data).unwrap_err();
        assert!(err.to_string().contains("compression method 7"));
    }

    #[test]
    fn test_parse_reserved_flags() {
        let data = create_test_header(0x20);
        assert!(matches!(
            GzipHeader::parse(&data),
            Err(DecompressionError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_parse_truncated_header() {
        let data = create_test_header(0);
        assert!(matches!(
            GzipHeader::parse(&data[..6]),
            Err(DecompressionError::Truncated { .. })
        ));

        // FNAME without a terminator
        let mut data = create_test_header(FNAME);
        data.extend_from_slice(b"unterminated");
        assert!(matches!(
            GzipHeader::parse(&data),
            Err(DecompressionError::Truncated { .. })
        ));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            GzipHeader::parse(&[]),
            Err(DecompressionError::Truncated { .. })
        ));
    }
}
