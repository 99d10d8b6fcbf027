//! Synthetic replay construction shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};

use sgreplay_parser::format::{HEADER_SIZE, REPLAY_MAGIC, SYSTEM_PLAYER_ID};
use sgreplay_parser::records::encode_frames;
use sgreplay_parser::wire::MessageBuilder;

/// Changelist written into synthetic headers.
pub const CHANGELIST: u32 = 83_461;

/// Building type used by the two-player scenario.
pub const BARRACKS: u64 = 597_044_510;

/// Raw X coordinate that decodes to -2320.
pub const RAW_X: u64 = 18_446_744_073_557_508_096;

/// Builds `.SGReplay` bytes from messages and an optional footer.
#[derive(Debug, Clone)]
pub struct ReplayBuilder {
    version: u32,
    data_offset: u32,
    changelist: u32,
    messages: Vec<Vec<u8>>,
    stream_tail: Vec<u8>,
    footer: Option<Vec<u8>>,
    filename: Option<String>,
    comment: Option<String>,
    extra: Option<Vec<u8>>,
}

impl Default for ReplayBuilder {
    fn default() -> Self {
        ReplayBuilder {
            version: 1,
            data_offset: HEADER_SIZE as u32,
            changelist: CHANGELIST,
            messages: Vec::new(),
            stream_tail: Vec::new(),
            footer: None,
            filename: None,
            comment: None,
            extra: None,
        }
    }
}

impl ReplayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn data_offset(mut self, offset: u32) -> Self {
        self.data_offset = offset;
        self
    }

    /// Adds a top-level message wrapping `content` in the envelope.
    pub fn message(mut self, frame: u64, player: u32, content: MessageBuilder) -> Self {
        self.messages.push(top_level(frame, player, content));
        self
    }

    /// Adds a message body verbatim.
    pub fn raw_message(mut self, body: &[u8]) -> Self {
        self.messages.push(body.to_vec());
        self
    }

    /// Appends unframed bytes to the inflated stream.
    pub fn stream_tail(mut self, bytes: &[u8]) -> Self {
        self.stream_tail = bytes.to_vec();
        self
    }

    pub fn footer(mut self, footer: MessageBuilder) -> Self {
        self.footer = Some(footer.build());
        self
    }

    /// Places `bytes` after the gzip trailer verbatim.
    pub fn footer_raw(mut self, bytes: &[u8]) -> Self {
        self.footer = Some(bytes.to_vec());
        self
    }

    pub fn without_footer(mut self) -> Self {
        self.footer = None;
        self
    }

    pub fn gzip_filename(mut self, name: &str) -> Self {
        self.filename = Some(name.to_string());
        self
    }

    pub fn gzip_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn gzip_extra(mut self, extra: &[u8]) -> Self {
        self.extra = Some(extra.to_vec());
        self
    }

    /// Returns the inflated message stream.
    pub fn stream(&self) -> Vec<u8> {
        let mut stream = encode_frames(self.messages.iter().map(Vec::as_slice));
        stream.extend_from_slice(&self.stream_tail);
        stream
    }

    /// Returns the gzip member (header, deflate body, trailer).
    pub fn gzip_member(&self) -> Vec<u8> {
        let stream = self.stream();
        if self.filename.is_none() && self.comment.is_none() && self.extra.is_none() {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&stream).unwrap();
            return encoder.finish().unwrap();
        }

        let mut builder = GzBuilder::new();
        if let Some(name) = &self.filename {
            builder = builder.filename(name.as_bytes());
        }
        if let Some(comment) = &self.comment {
            builder = builder.comment(comment.as_bytes());
        }
        if let Some(extra) = &self.extra {
            builder = builder.extra(extra.clone());
        }
        let mut encoder = builder.write(Vec::new(), Compression::default());
        encoder.write_all(&stream).unwrap();
        encoder.finish().unwrap()
    }

    /// Returns the 20-byte container header followed by any padding up to
    /// the data offset.
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for value in [REPLAY_MAGIC, self.version, self.data_offset, self.changelist, 0] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        while out.len() < self.data_offset as usize {
            out.push(0);
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header_bytes();
        out.extend_from_slice(&self.gzip_member());
        if let Some(footer) = &self.footer {
            out.extend_from_slice(footer);
        }
        out
    }
}

/// Wraps action fields into frame / player / envelope.
pub fn top_level(frame: u64, player: u32, content: MessageBuilder) -> Vec<u8> {
    MessageBuilder::new()
        .varint(1, frame)
        .varint(2, u64::from(player))
        .message(3, MessageBuilder::new().message(1, content))
        .build()
}

pub fn map_info(name: &str) -> MessageBuilder {
    MessageBuilder::new().message(
        3,
        MessageBuilder::new()
            .varint(1, 0xDEAD)
            .string(2, name)
            .varint(3, u64::from(CHANGELIST)),
    )
}

pub fn player_info(slot: u32, name: &str) -> MessageBuilder {
    MessageBuilder::new().message(
        37,
        MessageBuilder::new()
            .varint(2, u64::from(slot))
            .string(3, name),
    )
}

/// A construction order at raw fixed-point coordinates.
pub fn build_command(slot: u32, building_type: u64, ability_id: u64, raw_x: u64, raw_y: u64) -> MessageBuilder {
    MessageBuilder::new().message(
        7,
        MessageBuilder::new()
            .varint(2, u64::from(slot))
            .message(
                4,
                MessageBuilder::new()
                    .varint(1, ability_id)
                    .varint(3, building_type)
                    .message(4, MessageBuilder::new().varint(1, raw_x).varint(2, raw_y)),
            ),
    )
}

/// A plain ability command against a target entity.
pub fn target_command(slot: u32, ability_id: u64, target_id: u64, target_type: u64) -> MessageBuilder {
    MessageBuilder::new().message(
        7,
        MessageBuilder::new()
            .varint(2, u64::from(slot))
            .message(4, MessageBuilder::new().varint(1, ability_id))
            .message(
                9,
                MessageBuilder::new()
                    .varint(1, target_id)
                    .varint(2, target_type),
            ),
    )
}

pub fn chat(text: &str) -> MessageBuilder {
    MessageBuilder::new().message(45, MessageBuilder::new().string(1, text))
}

pub fn sync(counter: u64) -> MessageBuilder {
    MessageBuilder::new().message(
        40,
        MessageBuilder::new()
            .varint(1, counter)
            .bytes(2, &[1, 2, 3, 4, 5])
            .varint(3, counter),
    )
}

/// A footer player entry; `lost` sets the loss marker.
pub fn footer_player(slot: u32, name: &str, team: u32, lost: bool) -> MessageBuilder {
    let entry = MessageBuilder::new()
        .varint(1, u64::from(slot))
        .string(2, name);
    let entry = if lost { entry.varint(4, 1) } else { entry };
    entry.varint(5, u64::from(team))
}

/// The two-player game used across the integration tests: Alice (slot 1)
/// beats Bob (slot 2) on DesolateTemple after 13:28.
pub fn two_player_game() -> ReplayBuilder {
    ReplayBuilder::new()
        .message(0, SYSTEM_PLAYER_ID, map_info("DesolateTemple"))
        .message(0, SYSTEM_PLAYER_ID, sync(1))
        .message(0, 1, player_info(1, "Alice"))
        .message(0, 2, player_info(2, "Bob"))
        .message(13_796, 1, build_command(1, BARRACKS, 0xA1, RAW_X, 65_536 * 100))
        .message(20_480, 2, build_command(2, 42, 0xA2, 65_536, 65_536))
        .message(40_960, 1, target_command(1, 0xB1, 9001, 77))
        .message(81_920, 2, chat("gl hf"))
        .footer(two_player_footer())
}

/// Footer of [`two_player_game`].
pub fn two_player_footer() -> MessageBuilder {
    MessageBuilder::new()
        .string(1, "match-1")
        .varint(2, 827_812)
        .message(3, footer_player(1, "Alice", 1, false))
        .message(3, footer_player(2, "Bob", 2, true))
        .string(4, "DesolateTemple")
}
