//! # SGReplay Parser
//!
//! A parser for Stormgate replay files (`.SGReplay`).
//!
//! A replay is a 20-byte header followed by a gzip member whose inflated
//! body is a sequence of length-prefixed protobuf-style messages. The
//! bytes after the deflate stream hold the gzip trailer and, in finished
//! games, a result footer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sgreplay_parser::{parse_file, ParseOptions, Result};
//!
//! fn summarize(path: &str) -> Result<()> {
//!     let game = parse_file(path, &ParseOptions::default())?;
//!
//!     println!("Map: {}", game.map_name.as_deref().unwrap_or("?"));
//!     println!("Duration: {}", game.duration);
//!     for player in &game.players {
//!         println!(
//!             "  {} ({:?}): {:.0} APM, {} buildings",
//!             player.display_name(),
//!             player.outcome,
//!             player.apm,
//!             player.build_order.len()
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types per pipeline stage and the crate result alias
//! - [`binary`] - Low-level little-endian reading utilities
//! - [`format`] - Format constants and tick-rate conventions
//! - [`header`] - Container header validation
//! - [`decompress`] - Gzip header parsing and raw inflation
//! - [`records`] - Message framing and footer recovery
//! - [`wire`] - Schema-less wire-format decoding
//! - [`events`] - Typed event extraction
//! - [`stats`] - Per-player statistics and the assembled [`Game`]
//! - [`assets`] - Optional hash to name resolution
//! - [`replay`] / [`batch`] - Pipeline entry points
//!
//! ## Format Reference
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00 | 4 | Magic `0xE3B0A49D` |
//! | 0x04 | 4 | Version |
//! | 0x08 | 4 | Data offset |
//! | 0x0C | 4 | Changelist |
//! | 0x10 | 4 | Flags |
//!
//! All multi-byte integers are stored in little-endian byte order.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod anomaly;
pub mod assets;
pub mod batch;
pub mod binary;
pub mod config;
pub mod decompress;
pub mod error;
pub mod events;
pub mod format;
pub mod header;
pub mod records;
pub mod replay;
pub mod stats;
pub mod wire;

// Re-export commonly used types at the crate root
pub use anomaly::{Anomaly, AnomalyKind};
pub use assets::AssetTable;
pub use config::ParseOptions;
pub use decompress::decompress;
pub use error::{ParserError, Result};
pub use events::{EventContent, ReplayEvent};
pub use format::TickRate;
pub use header::ReplayHeader;
pub use records::{Footer, Outcome};
pub use replay::{
    decode_container, parse_file, parse_file_with_assets, parse_replay, parse_replay_with_assets,
};
pub use stats::{Game, PlayerStats};
pub use wire::{FieldTree, WireValue};
