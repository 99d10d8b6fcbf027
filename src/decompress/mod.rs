//! Decompression of the replay stream.
//!
//! The payload after the container header is one gzip member: a
//! variable-length gzip header, a raw deflate body, and then whatever the
//! game appended. The deflate body is inflated with a low-level
//! [`flate2::Decompress`] so the exact end of the deflate stream is known;
//! every byte after it (the gzip trailer plus an optional result message)
//! is handed back untouched.
//!
//! # Usage
//!
//! ```
//! use std::io::Write;
//!
//! use flate2::write::GzEncoder;
//! use flate2::Compression;
//! use sgreplay_parser::decompress::decompress;
//!
//! let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
//! encoder.write_all(b"\x02\x08\x01").unwrap();
//! let mut payload = encoder.finish().unwrap();
//! payload.extend_from_slice(b"appended");
//!
//! let inflated = decompress(&payload).unwrap();
//! assert_eq!(inflated.data, b"\x02\x08\x01");
//! // 8-byte gzip trailer followed by the appended bytes
//! assert_eq!(&inflated.trailing[8..], b"appended");
//! ```

pub mod gzip;

pub use gzip::GzipHeader;

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, trace};

use crate::error::DecompressionError;

/// Initial output capacity relative to the compressed size.
const EXPANSION_HINT: usize = 4;

/// Minimum growth step for the output buffer.
const MIN_CHUNK: usize = 16 * 1024;

/// The result of inflating a replay payload.
#[derive(Debug, Clone)]
pub struct Inflated<'a> {
    /// The parsed gzip header.
    pub gzip_header: GzipHeader,
    /// The inflated message stream.
    pub data: Vec<u8>,
    /// All bytes after the end of the deflate stream.
    pub trailing: &'a [u8],
    /// Number of compressed bytes in the deflate body.
    pub compressed_len: usize,
}

/// Parses the gzip header and inflates the deflate body that follows.
///
/// # Errors
///
/// - `DecompressionError::InvalidHeader` if the gzip header is malformed
/// - `DecompressionError::Invalid` if the deflate data is corrupt
/// - `DecompressionError::Truncated` if the input ends before the deflate
///   stream does
pub fn decompress(payload: &[u8]) -> Result<Inflated<'_>, DecompressionError> {
    let gzip_header = GzipHeader::parse(payload)?;
    debug!(
        header_len = gzip_header.header_len,
        flags = gzip_header.flags,
        "parsed gzip header"
    );

    let body = &payload[gzip_header.header_len..];
    let (data, consumed) = inflate_raw(body)?;

    Ok(Inflated {
        gzip_header,
        data,
        trailing: &body[consumed..],
        compressed_len: consumed,
    })
}

/// Inflates a raw deflate stream and returns the output together with the
/// number of input bytes the stream occupied.
///
/// Bytes after the end-of-stream marker are not consumed.
///
/// # Errors
///
/// `DecompressionError::Invalid` on corrupt data and
/// `DecompressionError::Truncated` when the input runs out first.
#[allow(clippy::cast_possible_truncation)]
pub fn inflate_raw(body: &[u8]) -> Result<(Vec<u8>, usize), DecompressionError> {
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(body.len().saturating_mul(EXPANSION_HINT).max(MIN_CHUNK));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(MIN_CHUNK));
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();

        let status = inflater
            .decompress_vec(&body[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| DecompressionError::Invalid {
                consumed,
                reason: e.to_string(),
            })?;

        if status == Status::StreamEnd {
            let consumed = inflater.total_in() as usize;
            trace!(consumed, produced = out.len(), "deflate stream ended");
            return Ok((out, consumed));
        }

        let progressed =
            inflater.total_in() as usize != consumed || inflater.total_out() != produced;
        if !progressed {
            return Err(DecompressionError::Truncated {
                consumed: inflater.total_in() as usize,
                available: body.len(),
                produced: out.len(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::{DeflateEncoder, GzEncoder};
    use flate2::{Compression, GzBuilder};

    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_basic() {
        let payload = gzip(b"hello replay");
        let inflated = decompress(&payload).unwrap();

        assert_eq!(inflated.data, b"hello replay");
        assert_eq!(inflated.trailing.len(), 8);
        assert_eq!(inflated.gzip_header.header_len, 10);
    }

    #[test]
    fn test_decompress_keeps_bytes_after_trailer() {
        let mut payload = gzip(b"events");
        payload.extend_from_slice(&[0x0A, 0x03, b'a', b'b', b'c']);

        let inflated = decompress(&payload).unwrap();
        assert_eq!(inflated.trailing.len(), 8 + 5);
        assert_eq!(&inflated.trailing[8..], &[0x0A, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_decompress_with_name_and_comment() {
        let mut encoder = GzBuilder::new()
            .filename("CL83461.SGReplay")
            .comment("ranked")
            .extra(vec![1, 2, 3, 4])
            .write(Vec::new(), Compression::default());
        encoder.write_all(b"flagged").unwrap();
        let payload = encoder.finish().unwrap();

        let inflated = decompress(&payload).unwrap();
        assert_eq!(inflated.data, b"flagged");
        assert_eq!(
            inflated.gzip_header.filename.as_deref(),
            Some("CL83461.SGReplay")
        );
        assert_eq!(inflated.gzip_header.comment.as_deref(), Some("ranked"));
        assert_eq!(inflated.gzip_header.extra.as_deref(), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(inflated.trailing.len(), 8);
    }

    #[test]
    fn test_decompress_with_header_crc() {
        let mut payload = vec![0x1F, 0x8B, 0x08, gzip::FHCRC, 0, 0, 0, 0, 0, 0xFF];
        payload.extend_from_slice(&[0x12, 0x34]);
        payload.extend_from_slice(&deflate(b"crc"));

        let inflated = decompress(&payload).unwrap();
        assert_eq!(inflated.gzip_header.header_len, 12);
        assert_eq!(inflated.data, b"crc");
        assert!(inflated.trailing.is_empty());
    }

    #[test]
    fn test_decompress_large_output() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 7) as u8).collect();
        let gz = gzip(&data);
        let inflated = decompress(&gz).unwrap();
        assert_eq!(inflated.data, data);
    }

    #[test]
    fn test_decompress_truncated_stream() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let payload = gzip(&data);
        let cut = &payload[..payload.len() / 2];

        assert!(matches!(
            decompress(cut),
            Err(DecompressionError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decompress_header_only() {
        let payload = vec![0x1F, 0x8B, 0x08, 0, 0, 0, 0, 0, 0, 0xFF];
        assert!(matches!(
            decompress(&payload),
            Err(DecompressionError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decompress_corrupt_stream() {
        let mut payload = vec![0x1F, 0x8B, 0x08, 0, 0, 0, 0, 0, 0, 0xFF];
        // BTYPE = 11 is reserved and always invalid
        payload.extend_from_slice(&[0x07, 0x00, 0x00, 0x00]);

        assert!(matches!(
            decompress(&payload),
            Err(DecompressionError::Invalid { .. })
        ));
    }

    #[test]
    fn test_decompress_not_gzip() {
        assert!(matches!(
            decompress(b"PK\x03\x04 not gzip"),
            Err(DecompressionError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_inflate_raw_reports_consumed() {
        let mut body = deflate(b"exact");
        let stream_len = body.len();
        body.extend_from_slice(b"tail");

        let (out, consumed) = inflate_raw(&body).unwrap();
        assert_eq!(out, b"exact");
        assert_eq!(consumed, stream_len);
    }
}
