//! Recovery of the result footer appended after the compressed stream.
//!
//! Bytes that follow the deflate stream are laid out as:
//!
//! | Size | Field | Description |
//! |------|-------|-------------|
//! | 4 | `crc32` | Gzip trailer CRC (not verified) |
//! | 4 | `isize` | Gzip trailer inflated length modulo 2^32 |
//! | rest | footer | Optional result message, not length-prefixed |
//!
//! # Footer Message
//!
//! | Field | Type | Meaning |
//! |-------|------|---------|
//! | 1 | string | match id |
//! | 2 | varint | final frame |
//! | 3 | message (repeated) | player entry |
//! | 4 | string | map name |
//!
//! Player entry: 1 slot, 2 name, 3 position, 4 result, 5 team. A present
//! `result` marks a loss and an absent one a win; the value itself carries
//! no further meaning.

use serde::Serialize;
use tracing::{debug, warn};

use crate::anomaly::{Anomaly, AnomalyKind};
use crate::binary::read_u32_le;
use crate::wire::varint::decode_varint;
use crate::wire::FieldTree;

/// Size of the gzip trailer.
pub const TRAILER_SIZE: usize = 8;

/// Top-level footer field numbers.
pub mod fields {
    /// Match identifier (string).
    pub const MATCH_ID: u32 = 1;
    /// Final frame (varint).
    pub const FINAL_FRAME: u32 = 2;
    /// Player entries (repeated message).
    pub const PLAYERS: u32 = 3;
    /// Map name (string).
    pub const MAP_NAME: u32 = 4;
}

/// Player entry field numbers.
pub mod player_fields {
    /// Player slot.
    pub const SLOT: u32 = 1;
    /// Display name.
    pub const NAME: u32 = 2;
    /// Start position.
    pub const POSITION: u32 = 3;
    /// Loss marker.
    pub const RESULT: u32 = 4;
    /// Team number.
    pub const TEAM: u32 = 5;
}

/// The gzip trailer that precedes the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GzipTrailer {
    /// CRC32 of the inflated data as stored.
    pub crc32: u32,
    /// Inflated length modulo 2^32 as stored.
    pub isize: u32,
}

/// A player's result as reported by the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The player won.
    Win,
    /// The player lost.
    Loss,
    /// No footer, or the player is not listed in it.
    Unknown,
}

/// One player entry of the footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerResult {
    /// Player slot.
    pub slot: Option<u32>,
    /// Display name.
    pub name: Option<String>,
    /// Loss marker. Present means the player lost.
    pub result: Option<u64>,
    /// Team number.
    pub team: Option<u32>,
    /// Start position.
    pub position: Option<u32>,
}

impl PlayerResult {
    /// Projects one player entry.
    #[must_use]
    pub fn from_tree(tree: &FieldTree<'_>) -> Self {
        PlayerResult {
            slot: tree.get(player_fields::SLOT).and_then(|v| v.as_u32()),
            name: tree.string(player_fields::NAME).map(str::to_owned),
            result: tree.varint(player_fields::RESULT),
            team: tree.get(player_fields::TEAM).and_then(|v| v.as_u32()),
            position: tree.get(player_fields::POSITION).and_then(|v| v.as_u32()),
        }
    }

    /// Returns the player's outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.result.is_some() {
            Outcome::Loss
        } else {
            Outcome::Win
        }
    }
}

/// The out-of-band result summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footer {
    /// Match identifier.
    pub match_id: Option<String>,
    /// Last game tick.
    pub final_frame: Option<u64>,
    /// Map name.
    pub map_name: Option<String>,
    /// Player entries in footer order.
    pub players: Vec<PlayerResult>,
    /// The full decoded message, including fields not projected above.
    #[serde(skip)]
    pub raw: FieldTree<'static>,
}

impl Footer {
    /// Projects a decoded footer message.
    #[must_use]
    pub fn from_tree(tree: &FieldTree<'_>) -> Self {
        Footer {
            match_id: tree.string(fields::MATCH_ID).map(str::to_owned),
            final_frame: tree.varint(fields::FINAL_FRAME),
            map_name: tree.string(fields::MAP_NAME).map(str::to_owned),
            players: tree
                .messages(fields::PLAYERS)
                .map(|p| PlayerResult::from_tree(&p))
                .collect(),
            raw: tree.clone().into_owned(),
        }
    }

    /// Finds a player entry by slot.
    #[must_use]
    pub fn player_by_slot(&self, slot: u32) -> Option<&PlayerResult> {
        self.players.iter().find(|p| p.slot == Some(slot))
    }

    /// Finds a player entry by name.
    #[must_use]
    pub fn player_by_name(&self, name: &str) -> Option<&PlayerResult> {
        self.players.iter().find(|p| p.name.as_deref() == Some(name))
    }

    /// Returns the outcome for a player, matched by slot first and by name
    /// second.
    #[must_use]
    pub fn outcome_for(&self, slot: Option<u32>, name: Option<&str>) -> Outcome {
        slot.and_then(|s| self.player_by_slot(s))
            .or_else(|| name.and_then(|n| self.player_by_name(n)))
            .map_or(Outcome::Unknown, PlayerResult::outcome)
    }
}

/// Everything recovered from the bytes after the deflate stream.
#[derive(Debug, Clone, Default)]
pub struct FooterRecovery {
    /// The gzip trailer, if eight bytes were present.
    pub trailer: Option<GzipTrailer>,
    /// The footer, if present and decodable.
    pub footer: Option<Footer>,
    /// Irregularities found on the way.
    pub anomalies: Vec<Anomaly>,
}

/// Interprets the bytes left over after inflation.
///
/// Never fails: a missing or undecodable footer is reported through the
/// returned anomalies.
#[must_use]
pub fn recover_footer(trailing: &[u8], inflated_len: usize) -> FooterRecovery {
    let mut recovery = FooterRecovery::default();

    let (Ok(crc32), Ok(stored_size)) = (read_u32_le(trailing, 0), read_u32_le(trailing, 4)) else {
        if !trailing.is_empty() || inflated_len > 0 {
            warn!(len = trailing.len(), "gzip trailer shorter than {TRAILER_SIZE} bytes");
            recovery.anomalies.push(Anomaly::new(
                AnomalyKind::ShortTrailer,
                format!("{} bytes after deflate stream", trailing.len()),
            ));
        }
        return recovery;
    };

    #[allow(clippy::cast_possible_truncation)]
    let expected = inflated_len as u32;
    if stored_size != expected {
        warn!(stored_size, inflated = inflated_len, "gzip ISIZE mismatch");
        recovery.anomalies.push(Anomaly::new(
            AnomalyKind::SizeMismatch,
            format!("trailer ISIZE {stored_size}, inflated {inflated_len} bytes"),
        ));
    }
    recovery.trailer = Some(GzipTrailer {
        crc32,
        isize: stored_size,
    });

    let rest = &trailing[TRAILER_SIZE..];
    if rest.is_empty() {
        debug!("no footer after gzip trailer");
        return recovery;
    }

    match decode_footer_message(rest) {
        Some(tree) => {
            let footer = Footer::from_tree(&tree);
            debug!(
                players = footer.players.len(),
                final_frame = ?footer.final_frame,
                "recovered footer"
            );
            recovery.footer = Some(footer);
        }
        None => {
            warn!(len = rest.len(), "footer bytes do not decode as a message");
            recovery.anomalies.push(Anomaly::new(
                AnomalyKind::UndecodableFooter,
                format!("{} footer bytes", rest.len()),
            ));
        }
    }

    recovery
}

/// Decodes the footer as a bare message, falling back to a single
/// length-prefixed message that spans exactly the remaining bytes.
fn decode_footer_message(bytes: &[u8]) -> Option<FieldTree<'_>> {
    if let Ok(tree) = FieldTree::parse(bytes) {
        return Some(tree);
    }

    let (len, prefix) = decode_varint(bytes, 0).ok()?;
    let body = bytes.get(prefix..)?;
    if usize::try_from(len).ok()? != body.len() {
        return None;
    }
    FieldTree::parse(body).ok()
}
