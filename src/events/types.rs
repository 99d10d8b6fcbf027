//! Typed replay events.

use std::fmt;

use serde::Serialize;

use crate::format::SYSTEM_PLAYER_ID;
use crate::wire::FieldTree;

/// One decoded event.
///
/// Events are produced in stream order, which is the authoritative order
/// for everything downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayEvent {
    /// Game tick of the message that carried the event.
    pub frame: u64,
    /// Issuing player: 1-5 for players, 64 for the system.
    pub player_id: Option<u32>,
    /// Index of the carrying message in the stream.
    pub message_index: usize,
    /// The event payload.
    pub content: EventContent,
}

impl ReplayEvent {
    /// Returns whether the event was issued by the system player.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.player_id == Some(SYSTEM_PLAYER_ID)
    }

    /// Returns the command payload, if this is a command.
    #[must_use]
    pub fn as_command(&self) -> Option<&Command> {
        match &self.content {
            EventContent::Command(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.player_id {
            Some(pid) => write!(f, "[P{pid} @{}] {}", self.frame, self.content.type_name()),
            None => write!(f, "[-- @{}] {}", self.frame, self.content.type_name()),
        }
    }
}

/// Event payloads, one per dispatched action kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventContent {
    /// Map metadata.
    MapInfo(MapInfo),
    /// A player joining a slot.
    PlayerInfo(PlayerInfo),
    /// A player command.
    Command(Command),
    /// An entity coming into existence.
    Spawn(SpawnEvent),
    /// A lockstep synchronisation check.
    Sync(SyncData),
    /// A chat line or a player profile record.
    ChatOrProfile(ChatOrProfile),
    /// An action outside the dispatch table, kept verbatim.
    Unknown {
        /// The action field number.
        action: u32,
        /// The action's decoded fields.
        fields: FieldTree<'static>,
    },
}

impl EventContent {
    /// Returns the name of this event kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            EventContent::MapInfo(_) => "MapInfo",
            EventContent::PlayerInfo(_) => "PlayerInfo",
            EventContent::Command(_) => "Command",
            EventContent::Spawn(_) => "Spawn",
            EventContent::Sync(_) => "Sync",
            EventContent::ChatOrProfile(_) => "ChatOrProfile",
            EventContent::Unknown { .. } => "Unknown",
        }
    }

    /// Returns `true` if this is an action outside the dispatch table.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, EventContent::Unknown { .. })
    }
}

/// Map metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapInfo {
    /// Map name.
    pub map_name: Option<String>,
    /// Map asset hash (unresolved).
    pub map_hash: Option<u64>,
    /// Changelist the map was built for.
    pub changelist: Option<u64>,
}

/// A player taking a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    /// Player slot.
    pub slot: Option<u32>,
    /// Display name.
    pub name: Option<String>,
}

/// A world position in map units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    /// X coordinate.
    pub x: Option<f64>,
    /// Y coordinate.
    pub y: Option<f64>,
}

/// The ability part of a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AbilityData {
    /// Ability hash (unresolved).
    pub ability_id: Option<u64>,
    /// Position index.
    pub position_index: Option<u64>,
    /// Building type hash; present only for construction orders.
    pub building_type: Option<u64>,
    /// Target position.
    pub coords: Option<Point>,
}

/// The target part of a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetData {
    /// Target entity id.
    pub target_id: Option<u64>,
    /// Target type hash (unresolved).
    pub target_type: Option<u64>,
    /// Slot of the target's owner.
    pub player_slot: Option<u32>,
    /// Entity reference.
    pub entity_ref: Option<u64>,
    /// Target X coordinate.
    pub x: Option<f64>,
    /// Target Y coordinate.
    pub y: Option<f64>,
}

/// A player command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Command {
    /// Issuing slot as stored in the command.
    pub player_slot: Option<u32>,
    /// Ability data.
    pub ability: Option<AbilityData>,
    /// Target data.
    pub target: Option<TargetData>,
    /// Every command field not projected above.
    pub unknown_fields: FieldTree<'static>,
}

impl Command {
    /// Returns the building type if this command orders a construction.
    #[must_use]
    pub fn building_type(&self) -> Option<u64> {
        self.ability.as_ref().and_then(|a| a.building_type)
    }

    /// Returns the ability hash.
    #[must_use]
    pub fn ability_id(&self) -> Option<u64> {
        self.ability.as_ref().and_then(|a| a.ability_id)
    }
}

/// An entity coming into existence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpawnEvent {
    /// Owning player.
    pub owner: Option<u32>,
    /// Entity id.
    pub entity_id: Option<u64>,
    /// Unit type hash (unresolved).
    pub unit_type: Option<u64>,
}

/// A lockstep synchronisation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncData {
    /// First counter.
    pub counter: Option<u64>,
    /// Five-byte state checksum.
    pub checksum: Option<[u8; 5]>,
    /// Second counter.
    pub counter2: Option<u64>,
    /// Whether this is the first sync of the stream.
    pub initial: bool,
}

/// A chat line (when `text` is present) or a player profile record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatOrProfile {
    /// Chat text.
    pub text: Option<String>,
    /// Profile display name.
    pub name: Option<String>,
    /// Profile player id as text.
    pub player_id_text: Option<String>,
}

impl ChatOrProfile {
    /// Returns whether this record carries a chat line.
    #[must_use]
    pub fn is_chat(&self) -> bool {
        self.text.is_some()
    }
}
