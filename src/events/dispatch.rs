//! The action dispatch table and the field layouts it projects through.
//!
//! Each top-level message wraps a content message whose field numbers name
//! actions. The table below maps an action field number to the projection
//! that turns its value into an event; adding an action is a table edit.
//!
//! | Action | Kind | Projection |
//! |--------|------|------------|
//! | 1 | `MapInfoRef` | map-info message at `.3`, or name at `.2` |
//! | 3 | `MapInfoInline` | the action itself is a map-info message |
//! | 4 | `Spawn` | 1 owner, 2 entity id, 3 unit type |
//! | 7 | `Command` | 2 slot, 4 ability, 9 target; rest preserved |
//! | 37 | `PlayerInfo` | 2 slot, 3 name |
//! | 40 | `Sync` | 1 counter, 2 checksum, 3 counter2 |
//! | 45 | `ChatOrProfile` | 1 text, 5.1 name, 5.2 id text |

/// How an action's value is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Map metadata referenced from a wrapper message.
    MapInfoRef,
    /// Map metadata stored directly in the action.
    MapInfoInline,
    /// Entity spawn.
    Spawn,
    /// Player command.
    Command,
    /// Player joining a slot.
    PlayerInfo,
    /// Sync check.
    Sync,
    /// Chat line or profile record.
    ChatOrProfile,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionEntry {
    /// Field number of the action inside the content message.
    pub action: u32,
    /// Projection to apply.
    pub kind: ActionKind,
}

/// Action field numbers and their projections.
pub static ACTION_TABLE: &[ActionEntry] = &[
    ActionEntry { action: 1, kind: ActionKind::MapInfoRef },
    ActionEntry { action: 3, kind: ActionKind::MapInfoInline },
    ActionEntry { action: 4, kind: ActionKind::Spawn },
    ActionEntry { action: 7, kind: ActionKind::Command },
    ActionEntry { action: 37, kind: ActionKind::PlayerInfo },
    ActionEntry { action: 40, kind: ActionKind::Sync },
    ActionEntry { action: 45, kind: ActionKind::ChatOrProfile },
];

/// Looks up the projection for an action field number.
#[must_use]
pub fn lookup_action(action: u32) -> Option<ActionKind> {
    ACTION_TABLE
        .iter()
        .find(|entry| entry.action == action)
        .map(|entry| entry.kind)
}

/// Top-level message layout.
pub mod message {
    /// Game tick.
    pub const FRAME: u32 = 1;
    /// Issuing player.
    pub const PLAYER_ID: u32 = 2;
    /// Envelope wrapping the content.
    pub const ENVELOPE: u32 = 3;
    /// Content inside the envelope.
    pub const CONTENT: u32 = 1;
    /// Path from the top-level message to its content.
    pub const CONTENT_PATH: [u32; 2] = [ENVELOPE, CONTENT];
}

/// Map-name paths from the top-level message, tried in order.
pub const MAP_NAME_PATHS: [&[u32]; 3] = [&[3, 1, 3, 2], &[3, 1, 1, 3, 2], &[3, 1, 1, 2]];

/// Map-info message layout.
pub mod map_info {
    /// Map asset hash.
    pub const MAP_HASH: u32 = 1;
    /// Map name.
    pub const MAP_NAME: u32 = 2;
    /// Changelist.
    pub const CHANGELIST: u32 = 3;
    /// Where action 1 nests its map-info message.
    pub const NESTED: u32 = 3;
    /// Where action 1 stores a bare map name.
    pub const BARE_NAME: u32 = 2;
}

/// Spawn layout.
pub mod spawn {
    /// Owning player.
    pub const OWNER: u32 = 1;
    /// Entity id.
    pub const ENTITY_ID: u32 = 2;
    /// Unit type hash.
    pub const UNIT_TYPE: u32 = 3;
}

/// Command layout.
pub mod command {
    /// Issuing slot.
    pub const PLAYER_SLOT: u32 = 2;
    /// Ability message.
    pub const ABILITY: u32 = 4;
    /// Target message.
    pub const TARGET: u32 = 9;
}

/// Ability layout.
pub mod ability {
    /// Ability hash.
    pub const ABILITY_ID: u32 = 1;
    /// Position index.
    pub const POSITION_INDEX: u32 = 2;
    /// Building type hash.
    pub const BUILDING_TYPE: u32 = 3;
    /// Coordinates message.
    pub const COORDS: u32 = 4;
    /// X inside the coordinates message.
    pub const X: u32 = 1;
    /// Y inside the coordinates message.
    pub const Y: u32 = 2;
}

/// Target layout.
pub mod target {
    /// Target entity id.
    pub const TARGET_ID: u32 = 1;
    /// Target type hash.
    pub const TARGET_TYPE: u32 = 2;
    /// Owner slot.
    pub const PLAYER_SLOT: u32 = 3;
    /// Entity reference.
    pub const ENTITY_REF: u32 = 4;
    /// X coordinate.
    pub const X: u32 = 5;
    /// Y coordinate.
    pub const Y: u32 = 6;
}

/// Player-info layout.
pub mod player_info {
    /// Slot.
    pub const SLOT: u32 = 2;
    /// Display name.
    pub const NAME: u32 = 3;
}

/// Sync layout.
pub mod sync {
    /// First counter.
    pub const COUNTER: u32 = 1;
    /// Checksum bytes.
    pub const CHECKSUM: u32 = 2;
    /// Second counter.
    pub const COUNTER2: u32 = 3;
    /// Checksum length.
    pub const CHECKSUM_LEN: usize = 5;
}

/// Chat/profile layout.
pub mod chat {
    /// Chat text.
    pub const TEXT: u32 = 1;
    /// Profile message.
    pub const PROFILE: u32 = 5;
    /// Name inside the profile.
    pub const NAME: u32 = 1;
    /// Player id text inside the profile.
    pub const PLAYER_ID_TEXT: u32 = 2;
}
