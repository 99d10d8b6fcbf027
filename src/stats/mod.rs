//! Statistics folded from the event stream.
//!
//! [`GameBuilder`] consumes events in stream order and, together with the
//! container metadata, produces an immutable [`Game`]:
//!
//! - per-player command counts, APM and a per-minute APM timeline
//! - build orders from commands whose ability carries a building type
//! - chat lines with resolved speaker names
//! - win/loss and teams, taken only from the footer
//! - upgrades and Stormgate rewards when an asset table is supplied
//! - entity activity keyed by command target id
//!
//! [`ReplaySummary`] aggregates many games without mutating them.

pub mod entities;
pub mod game;
pub mod player;
pub mod summary;
pub mod tech;

pub use entities::{EntitySummary, EntityTracker};
pub use game::{ChatMessage, Game, GameBuilder, ReplayMetadata};
pub use player::{ApmBucket, BuildOrderEntry, PlayerStats};
pub use summary::{Record, ReplaySummary};
pub use tech::TechEntry;
