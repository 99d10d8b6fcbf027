//! Base-128 varints, shared by message framing and the wire walker.
//!
//! Each byte carries seven value bits, least significant group first; the
//! high bit marks continuation. A u64 needs at most ten bytes, so a tenth
//! byte with its continuation bit set is malformed.

/// Maximum encoded size of a u64 varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Why a varint could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The continuation bit was still set on the tenth byte.
    TooLong,
    /// The buffer ended before the final byte.
    Truncated,
}

/// Decodes a varint starting at `offset`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// `VarintError::TooLong` if no terminating byte appears within ten bytes,
/// `VarintError::Truncated` if the buffer ends first.
///
/// # Example
///
/// ```
/// use sgreplay_parser::wire::varint::decode_varint;
///
/// assert_eq!(decode_varint(&[0xAC, 0x02], 0), Ok((300, 2)));
/// ```
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;

    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = data.get(offset + i) else {
            return Err(VarintError::Truncated);
        };

        value |= u64::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(VarintError::TooLong)
}

/// Appends the varint encoding of `value` to `out`.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Returns the number of bytes `value` occupies when encoded.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}
