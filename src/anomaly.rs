//! Non-fatal irregularities found while decoding a replay.
//!
//! Anything the pipeline can survive is recorded here instead of being
//! raised as an error, so one odd message never costs the whole file.

use serde::Serialize;

/// The category of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// The gzip ISIZE does not match the inflated length.
    SizeMismatch,
    /// Fewer than eight bytes follow the deflate stream.
    ShortTrailer,
    /// Bytes after the trailer do not decode as a message.
    UndecodableFooter,
    /// A message body failed the wire walker and was skipped.
    MalformedMessage,
    /// A projected field carried values of more than one wire kind.
    FieldKindMismatch,
    /// A player's command ticks went backwards.
    FrameRegression,
    /// Stream ticks exceed the footer's final frame.
    FrameBeyondFooter,
    /// Message framing stopped early; later events are missing.
    TruncatedStream,
    /// A tick lies too far out for a per-minute timeline to be filled.
    ImplausibleFrame,
}

/// One recorded irregularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    /// What went wrong.
    pub kind: AnomalyKind,
    /// Index of the message involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_index: Option<usize>,
    /// Human-readable detail.
    pub detail: String,
}

impl Anomaly {
    /// Creates an anomaly not tied to a message.
    #[must_use]
    pub fn new(kind: AnomalyKind, detail: impl Into<String>) -> Self {
        Anomaly {
            kind,
            message_index: None,
            detail: detail.into(),
        }
    }

    /// Creates an anomaly tied to one message.
    #[must_use]
    pub fn at_message(kind: AnomalyKind, index: usize, detail: impl Into<String>) -> Self {
        Anomaly {
            kind,
            message_index: Some(index),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message_index {
            Some(index) => write!(f, "{:?} (message {index}): {}", self.kind, self.detail),
            None => write!(f, "{:?}: {}", self.kind, self.detail),
        }
    }
}
