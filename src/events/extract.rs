//! Projection of decoded messages into typed events.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace, warn};

use super::dispatch::{
    ability, chat, command, lookup_action, map_info, message, player_info, spawn, sync, target,
    ActionKind, MAP_NAME_PATHS,
};
use super::types::{
    AbilityData, ChatOrProfile, Command, EventContent, MapInfo, PlayerInfo, Point, ReplayEvent,
    SpawnEvent, SyncData, TargetData,
};
use crate::anomaly::{Anomaly, AnomalyKind};
use crate::error::FramingError;
use crate::records::MessageFramer;
use crate::wire::{fixed_to_world, FieldTree, WireValue};

/// Number of leading messages searched for a map name.
pub const MAP_SCAN_LIMIT: usize = 50;

/// Map names this short are treated as noise.
const MIN_MAP_NAME_LEN: usize = 4;

/// Stateful projector from message bodies to events.
///
/// Keeps the little cross-message state extraction needs (first sync,
/// per-player command ticks, the map name guess) and collects anomalies.
#[derive(Debug, Clone, Default)]
pub struct EventExtractor {
    seen_sync: bool,
    last_command_frame: HashMap<u32, u64>,
    map_name: Option<String>,
    max_frame: u64,
    messages: usize,
    malformed: usize,
    anomalies: Vec<Anomaly>,
}

impl EventExtractor {
    /// Creates an extractor with no state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one message body and projects its actions.
    ///
    /// A body the wire walker rejects yields no events and is recorded as
    /// an anomaly.
    pub fn extract_message(&mut self, index: usize, body: &[u8]) -> Vec<ReplayEvent> {
        self.messages += 1;
        match FieldTree::parse(body) {
            Ok(tree) => self.extract_tree(index, &tree),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed message");
                self.malformed += 1;
                self.anomalies.push(Anomaly::at_message(
                    AnomalyKind::MalformedMessage,
                    index,
                    e.to_string(),
                ));
                Vec::new()
            }
        }
    }

    /// Projects the actions of an already decoded message.
    pub fn extract_tree(&mut self, index: usize, tree: &FieldTree<'_>) -> Vec<ReplayEvent> {
        // proto3 default: an absent frame is tick 0
        let frame = tree.varint(message::FRAME).unwrap_or(0);
        let player_id = tree.get(message::PLAYER_ID).and_then(|v| v.as_u32());
        self.max_frame = self.max_frame.max(frame);

        if self.map_name.is_none() && index < MAP_SCAN_LIMIT {
            self.map_name = find_map_name(tree);
        }

        let Some(envelope) = self.nested(index, tree, message::ENVELOPE) else {
            return Vec::new();
        };
        let Some(content) = self.nested(index, &envelope, message::CONTENT) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for (action, value) in content.entries() {
            let payload = self.project_action(index, action, value);
            events.push(ReplayEvent {
                frame,
                player_id,
                message_index: index,
                content: payload,
            });
        }

        for event in &events {
            self.check_command_order(event);
        }

        trace!(index, frame, ?player_id, count = events.len(), "extracted events");
        events
    }

    /// Returns the map name found on a known top-level path.
    #[must_use]
    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    /// Returns the largest tick seen so far.
    #[must_use]
    pub fn max_frame(&self) -> u64 {
        self.max_frame
    }

    /// Returns the number of message bodies processed.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages
    }

    /// Returns the number of message bodies skipped as malformed.
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Returns the anomalies recorded so far.
    #[must_use]
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Takes the recorded anomalies, leaving none behind.
    pub fn take_anomalies(&mut self) -> Vec<Anomaly> {
        std::mem::take(&mut self.anomalies)
    }

    /// Reads a nested message, recording an anomaly if the field is present
    /// but does not decode.
    fn nested<'t>(&mut self, index: usize, tree: &'t FieldTree<'_>, field: u32) -> Option<FieldTree<'t>> {
        match tree.get(field)?.try_message() {
            Some(Ok(nested)) => Some(nested),
            Some(Err(e)) => {
                self.anomalies.push(Anomaly::at_message(
                    AnomalyKind::MalformedMessage,
                    index,
                    format!("field {field}: {e}"),
                ));
                None
            }
            None => {
                self.anomalies.push(Anomaly::at_message(
                    AnomalyKind::FieldKindMismatch,
                    index,
                    format!("field {field} is not a message"),
                ));
                None
            }
        }
    }

    fn project_action(&mut self, index: usize, action: u32, value: &WireValue<'_>) -> EventContent {
        let Some(kind) = lookup_action(action) else {
            return unknown(action, value);
        };

        let tree = match value.try_message() {
            Some(Ok(tree)) => tree,
            Some(Err(e)) => {
                debug!(index, action, error = %e, "action body does not decode");
                self.anomalies.push(Anomaly::at_message(
                    AnomalyKind::MalformedMessage,
                    index,
                    format!("action {action}: {e}"),
                ));
                return unknown(action, value);
            }
            None => {
                self.anomalies.push(Anomaly::at_message(
                    AnomalyKind::FieldKindMismatch,
                    index,
                    format!("action {action} carries a {:?} value", value.kind()),
                ));
                return unknown(action, value);
            }
        };

        let mixed = tree.mixed_kind_fields();
        if !mixed.is_empty() {
            self.anomalies.push(Anomaly::at_message(
                AnomalyKind::FieldKindMismatch,
                index,
                format!("action {action} fields {mixed:?} mix wire kinds"),
            ));
        }

        match kind {
            ActionKind::MapInfoRef => EventContent::MapInfo(project_map_ref(&tree)),
            ActionKind::MapInfoInline => EventContent::MapInfo(project_map_info(&tree)),
            ActionKind::Spawn => EventContent::Spawn(project_spawn(&tree)),
            ActionKind::Command => EventContent::Command(project_command(&tree)),
            ActionKind::PlayerInfo => EventContent::PlayerInfo(project_player_info(&tree)),
            ActionKind::Sync => {
                let initial = !self.seen_sync;
                self.seen_sync = true;
                EventContent::Sync(project_sync(&tree, initial))
            }
            ActionKind::ChatOrProfile => EventContent::ChatOrProfile(project_chat(&tree)),
        }
    }

    fn check_command_order(&mut self, event: &ReplayEvent) {
        let (Some(pid), EventContent::Command(_)) = (event.player_id, &event.content) else {
            return;
        };

        if let Some(&last) = self.last_command_frame.get(&pid) {
            if event.frame < last {
                self.anomalies.push(Anomaly::at_message(
                    AnomalyKind::FrameRegression,
                    event.message_index,
                    format!("player {pid} command at tick {} after tick {last}", event.frame),
                ));
            }
        }
        self.last_command_frame.insert(pid, event.frame);
    }
}

/// Tries the known map-name paths on a top-level message, in order.
#[must_use]
pub fn find_map_name(tree: &FieldTree<'_>) -> Option<String> {
    MAP_NAME_PATHS.iter().find_map(|path| {
        tree.string_at(path)
            .filter(|name| name.chars().count() >= MIN_MAP_NAME_LEN)
    })
}

fn unknown(action: u32, value: &WireValue<'_>) -> EventContent {
    let fields = match value.as_message() {
        Some(tree) => tree.into_owned(),
        None => {
            let mut tree = FieldTree::new();
            tree.push(action, value.clone().into_owned());
            tree
        }
    };
    EventContent::Unknown { action, fields }
}

fn number_u32(tree: &FieldTree<'_>, field: u32) -> Option<u32> {
    tree.get(field).and_then(|v| v.as_u32())
}

/// Decodes a fixed-point coordinate stored as a varint or fixed64.
fn coordinate(tree: &FieldTree<'_>, field: u32) -> Option<f64> {
    match tree.get(field)? {
        WireValue::Varint(raw) | WireValue::Fixed64(raw) => Some(fixed_to_world(*raw)),
        _ => None,
    }
}

fn project_map_info(tree: &FieldTree<'_>) -> MapInfo {
    MapInfo {
        map_name: tree.string(map_info::MAP_NAME).map(str::to_owned),
        map_hash: tree.varint(map_info::MAP_HASH),
        changelist: tree.varint(map_info::CHANGELIST),
    }
}

fn project_map_ref(tree: &FieldTree<'_>) -> MapInfo {
    let mut info = tree
        .message(map_info::NESTED)
        .map(|nested| project_map_info(&nested))
        .unwrap_or_default();
    if info.map_name.is_none() {
        info.map_name = tree.string(map_info::BARE_NAME).map(str::to_owned);
    }
    info
}

fn project_spawn(tree: &FieldTree<'_>) -> SpawnEvent {
    SpawnEvent {
        owner: number_u32(tree, spawn::OWNER),
        entity_id: tree.varint(spawn::ENTITY_ID),
        unit_type: tree.varint(spawn::UNIT_TYPE),
    }
}

fn project_ability(tree: &FieldTree<'_>) -> AbilityData {
    AbilityData {
        ability_id: tree.varint(ability::ABILITY_ID),
        position_index: tree.varint(ability::POSITION_INDEX),
        building_type: tree.varint(ability::BUILDING_TYPE),
        coords: tree.message(ability::COORDS).map(|c| Point {
            x: coordinate(&c, ability::X),
            y: coordinate(&c, ability::Y),
        }),
    }
}

fn project_target(tree: &FieldTree<'_>) -> TargetData {
    TargetData {
        target_id: tree.varint(target::TARGET_ID),
        target_type: tree.varint(target::TARGET_TYPE),
        player_slot: number_u32(tree, target::PLAYER_SLOT),
        entity_ref: tree.varint(target::ENTITY_REF),
        x: coordinate(tree, target::X),
        y: coordinate(tree, target::Y),
    }
}

/// Projects a command. Fields that are projected are removed from
/// `unknown_fields`; anything that does not have the expected shape stays
/// there untouched.
fn project_command(tree: &FieldTree<'_>) -> Command {
    let player_slot = number_u32(tree, command::PLAYER_SLOT);
    let ability = tree.message(command::ABILITY).map(|a| project_ability(&a));
    let target = tree.message(command::TARGET).map(|t| project_target(&t));

    let mut rest = tree.clone();
    if player_slot.is_some() {
        rest.remove(command::PLAYER_SLOT);
    }
    if ability.is_some() {
        rest.remove(command::ABILITY);
    }
    if target.is_some() {
        rest.remove(command::TARGET);
    }

    Command {
        player_slot,
        ability,
        target,
        unknown_fields: rest.into_owned(),
    }
}

fn project_player_info(tree: &FieldTree<'_>) -> PlayerInfo {
    PlayerInfo {
        slot: number_u32(tree, player_info::SLOT),
        name: tree.string(player_info::NAME).map(str::to_owned),
    }
}

fn project_sync(tree: &FieldTree<'_>, initial: bool) -> SyncData {
    let checksum = tree.bytes(sync::CHECKSUM).and_then(|bytes| {
        let array = <[u8; sync::CHECKSUM_LEN]>::try_from(bytes).ok();
        if array.is_none() {
            debug!(len = bytes.len(), "sync checksum has unexpected length");
        }
        array
    });

    SyncData {
        counter: tree.varint(sync::COUNTER),
        checksum,
        counter2: tree.varint(sync::COUNTER2),
        initial,
    }
}

fn project_chat(tree: &FieldTree<'_>) -> ChatOrProfile {
    ChatOrProfile {
        text: tree.string(chat::TEXT).map(str::to_owned),
        name: tree.string_at(&[chat::PROFILE, chat::NAME]),
        player_id_text: tree.string_at(&[chat::PROFILE, chat::PLAYER_ID_TEXT]),
    }
}

/// Lazy iterator from an inflated buffer to events.
///
/// Malformed messages are skipped and recorded on the extractor; a framing
/// error is yielded once and ends iteration.
#[derive(Debug, Clone)]
pub struct EventIterator<'a> {
    framer: MessageFramer<'a>,
    extractor: EventExtractor,
    pending: VecDeque<ReplayEvent>,
}

impl<'a> EventIterator<'a> {
    /// Creates an iterator over the messages of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        EventIterator {
            framer: MessageFramer::new(data),
            extractor: EventExtractor::new(),
            pending: VecDeque::new(),
        }
    }

    /// Returns the extractor state accumulated so far.
    #[must_use]
    pub fn extractor(&self) -> &EventExtractor {
        &self.extractor
    }

    /// Consumes the iterator, returning the extractor state.
    #[must_use]
    pub fn into_extractor(self) -> EventExtractor {
        self.extractor
    }
}

impl Iterator for EventIterator<'_> {
    type Item = Result<ReplayEvent, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            match self.framer.next()? {
                Ok(frame) => {
                    let events = self.extractor.extract_message(frame.index, frame.body);
                    self.pending.extend(events);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
