//! Length-prefixed message framing.
//!
//! The inflated stream is a concatenation of messages, each preceded by its
//! body length as a varint:
//!
//! ```text
//! [len varint][body: len bytes][len varint][body: len bytes]...
//! ```
//!
//! [`MessageFramer`] walks the buffer lazily, yielding borrowed
//! [`RawFrame`]s. A bad length prefix ends iteration; the frames already
//! produced remain valid.

use tracing::trace;

use crate::error::FramingError;
use crate::wire::varint::{decode_varint, encode_varint, VarintError};

/// One message body, borrowed from the inflated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Zero-based position of the message in the stream.
    pub index: usize,
    /// Byte offset of the length prefix.
    pub offset: usize,
    /// The message body.
    pub body: &'a [u8],
}

/// Lazy iterator over the messages of an inflated buffer.
///
/// Cloning the framer yields an independent cursor at the same position;
/// [`MessageFramer::reset`] rewinds to the start.
#[derive(Debug, Clone)]
pub struct MessageFramer<'a> {
    /// The inflated buffer.
    data: &'a [u8],

    /// Offset of the next length prefix.
    offset: usize,

    /// Number of frames yielded so far.
    index: usize,

    /// Whether iteration has completed (end of data or error).
    finished: bool,
}

impl<'a> MessageFramer<'a> {
    /// Creates a framer positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        MessageFramer {
            data,
            offset: 0,
            index: 0,
            finished: false,
        }
    }

    /// Rewinds to the first message.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.index = 0;
        self.finished = false;
    }

    /// Returns the byte offset of the next length prefix.
    #[must_use]
    pub fn current_offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of frames yielded so far.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.index
    }

    /// Returns whether iteration is complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn next_frame(&mut self) -> Result<RawFrame<'a>, FramingError> {
        let offset = self.offset;
        let (len, prefix_len) = decode_varint(self.data, offset).map_err(|e| match e {
            VarintError::TooLong => FramingError::VarintTooLong { offset },
            VarintError::Truncated => FramingError::Truncated {
                offset,
                declared: 0,
                available: self.data.len() - offset,
            },
        })?;

        let start = offset + prefix_len;
        let available = self.data.len() - start;
        let body_len = match usize::try_from(len) {
            Ok(n) if n <= available => n,
            _ => {
                return Err(FramingError::Truncated {
                    offset,
                    declared: len,
                    available,
                })
            }
        };

        let frame = RawFrame {
            index: self.index,
            offset,
            body: &self.data[start..start + body_len],
        };

        self.offset = start + body_len;
        self.index += 1;
        Ok(frame)
    }
}

impl<'a> Iterator for MessageFramer<'a> {
    type Item = Result<RawFrame<'a>, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.offset >= self.data.len() {
            self.finished = true;
            return None;
        }

        match self.next_frame() {
            Ok(frame) => {
                trace!(index = frame.index, offset = frame.offset, len = frame.body.len(), "frame");
                Some(Ok(frame))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for MessageFramer<'_> {}

/// Frames a sequence of bodies into one buffer.
///
/// Framing the bodies yielded by a [`MessageFramer`] reproduces its input.
pub fn encode_frames<'b, I>(bodies: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'b [u8]>,
{
    let mut out = Vec::new();
    for body in bodies {
        encode_varint(body.len() as u64, &mut out);
        out.extend_from_slice(body);
    }
    out
}
