//! Container header parsing for SGReplay files.
//!
//! Every replay starts with a fixed 20-byte little-endian header. The
//! compressed event stream begins at the header's declared data offset.
//!
//! # Header Layout (20 bytes)
//!
//! | Offset | Size | Field | Description |
//! |--------|------|-------|-------------|
//! | 0x00 | 4 | `magic` | Always 0xE3B0A49D |
//! | 0x04 | 4 | `version` | Container format version |
//! | 0x08 | 4 | `data_offset` | Start of the compressed stream |
//! | 0x0C | 4 | `changelist` | Game build that recorded the replay |
//! | 0x10 | 4 | `flags` | Opaque flags |
//!
//! # Usage
//!
//! ```
//! use sgreplay_parser::header::read_container;
//!
//! let mut data = Vec::new();
//! data.extend_from_slice(&0xE3B0_A49Du32.to_le_bytes());
//! data.extend_from_slice(&3u32.to_le_bytes());
//! data.extend_from_slice(&20u32.to_le_bytes());
//! data.extend_from_slice(&83_461u32.to_le_bytes());
//! data.extend_from_slice(&0u32.to_le_bytes());
//! data.extend_from_slice(b"\x1f\x8b");
//!
//! let container = read_container(&data).unwrap();
//! assert_eq!(container.header.changelist, 83_461);
//! assert_eq!(container.payload, b"\x1f\x8b");
//! ```

use serde::Serialize;
use tracing::warn;

use crate::binary::read_u32_le;
use crate::error::FormatError;
use crate::format::{HEADER_SIZE, MAX_SUPPORTED_VERSION, MIN_SUPPORTED_VERSION, REPLAY_MAGIC};

/// Parsed fixed header of a replay file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayHeader {
    /// Magic number at offset 0x00, always [`REPLAY_MAGIC`].
    pub magic: u32,

    /// Container version at offset 0x04.
    pub version: u32,

    /// Declared start of the compressed stream at offset 0x08, as stored.
    pub data_offset: u32,

    /// Build identifier at offset 0x0C. Monotonically increasing across
    /// game patches; used to select a tick convention.
    pub changelist: u32,

    /// Opaque flags at offset 0x10.
    pub flags: u32,
}

impl ReplayHeader {
    /// Parses the fixed header from the start of a replay.
    ///
    /// The magic check happens before anything else so that non-replay
    /// input never reaches the decompressor.
    ///
    /// # Errors
    ///
    /// - `FormatError::BadMagic` if the first four bytes are not the magic,
    ///   even when the rest of the header is missing
    /// - `FormatError::Truncated` if fewer than 20 bytes are available
    /// - `FormatError::UnsupportedVersion` if the version is out of range
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() >= 4 {
            let magic = read_u32_le(data, 0x00)?;
            if magic != REPLAY_MAGIC {
                return Err(FormatError::BadMagic {
                    expected: REPLAY_MAGIC,
                    found: magic,
                });
            }
        }

        if data.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                expected: HEADER_SIZE,
                available: data.len(),
            });
        }

        let version = read_u32_le(data, 0x04)?;
        if !(MIN_SUPPORTED_VERSION..=MAX_SUPPORTED_VERSION).contains(&version) {
            return Err(FormatError::UnsupportedVersion {
                version,
                min: MIN_SUPPORTED_VERSION,
                max: MAX_SUPPORTED_VERSION,
            });
        }

        Ok(ReplayHeader {
            magic: REPLAY_MAGIC,
            version,
            data_offset: read_u32_le(data, 0x08)?,
            changelist: read_u32_le(data, 0x0C)?,
            flags: read_u32_le(data, 0x10)?,
        })
    }

    /// Returns the offset the compressed stream actually starts at.
    ///
    /// Offsets pointing inside the header are clamped to the header size.
    #[must_use]
    pub fn payload_offset(&self) -> usize {
        (self.data_offset as usize).max(HEADER_SIZE)
    }

    /// Returns whether the declared offset points inside the header.
    #[must_use]
    pub fn is_offset_clamped(&self) -> bool {
        (self.data_offset as usize) < HEADER_SIZE
    }
}

/// A validated header together with the bytes after its data offset.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    /// The parsed header.
    pub header: ReplayHeader,
    /// Everything from the data offset to the end of the file.
    pub payload: &'a [u8],
}

/// Validates the container header and splits off the compressed payload.
///
/// # Errors
///
/// Any [`ReplayHeader::parse`] error, or `FormatError::Truncated` when the
/// data offset lies beyond the end of the file.
pub fn read_container(data: &[u8]) -> Result<Container<'_>, FormatError> {
    let header = ReplayHeader::parse(data)?;

    if header.is_offset_clamped() {
        warn!(
            declared = header.data_offset,
            "data offset points inside the header, clamping to {HEADER_SIZE}"
        );
    }

    let offset = header.payload_offset();
    if offset > data.len() {
        return Err(FormatError::Truncated {
            expected: offset,
            available: data.len(),
        });
    }

    Ok(Container {
        header,
        payload: &data[offset..],
    })
}
