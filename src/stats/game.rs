//! The assembled game and the fold that builds it.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::entities::{EntitySummary, EntityTracker};
use super::player::{PlayerAccumulator, PlayerStats, MAX_TIMELINE_MINUTES};
use crate::anomaly::{Anomaly, AnomalyKind};
use crate::assets::AssetTable;
use crate::decompress::GzipHeader;
use crate::events::{EventContent, ReplayEvent};
use crate::format::{TickRate, SYSTEM_PLAYER_ID};
use crate::header::ReplayHeader;
use crate::records::{Footer, GzipTrailer, Outcome};

/// One chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Tick of the message.
    pub frame: u64,
    /// `m:ss` time of the message.
    pub time: String,
    /// Sending player id.
    pub player_id: Option<u32>,
    /// Sender display name, or the id as text.
    pub speaker: String,
    /// Message text.
    pub text: String,
}

/// Container-level data gathered before and after event extraction.
#[derive(Debug, Clone)]
pub struct ReplayMetadata {
    /// The container header.
    pub header: ReplayHeader,
    /// The gzip member header.
    pub gzip_header: GzipHeader,
    /// The gzip trailer, if present.
    pub trailer: Option<GzipTrailer>,
    /// The result footer, if present.
    pub footer: Option<Footer>,
    /// Map name found on a top-level message path.
    pub stream_map_name: Option<String>,
    /// Number of framed messages.
    pub message_count: usize,
    /// Anomalies recorded by earlier stages.
    pub anomalies: Vec<Anomaly>,
    /// Whether framing stopped before the end of the buffer.
    pub truncated: bool,
}

/// A fully decoded replay.
#[derive(Debug, Clone, Serialize)]
pub struct Game {
    /// The container header.
    pub header: ReplayHeader,
    /// The gzip member header.
    pub gzip_header: GzipHeader,
    /// The gzip trailer, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<GzipTrailer>,
    /// The result footer, if present.
    pub footer: Option<Footer>,
    /// Map name: footer first, then stream paths, then map-info events.
    pub map_name: Option<String>,
    /// Match identifier from the footer.
    pub match_id: Option<String>,
    /// Tick convention used for every time below.
    pub tick_rate: TickRate,
    /// Game length in ticks.
    pub duration_frames: u64,
    /// Game length in seconds.
    pub duration_seconds: f64,
    /// Game length as `m:ss`.
    pub duration: String,
    /// Players ordered by id.
    pub players: Vec<PlayerStats>,
    /// Chat lines in stream order.
    pub chat: Vec<ChatMessage>,
    /// Entity activity, most active first.
    pub entities: Vec<EntitySummary>,
    /// Event totals by kind.
    pub event_counts: BTreeMap<String, usize>,
    /// Number of framed messages.
    pub message_count: usize,
    /// Every event in stream order, when kept.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ReplayEvent>,
    /// Non-fatal irregularities.
    pub anomalies: Vec<Anomaly>,
    /// Whether the message stream ended early.
    pub truncated: bool,
}

impl Game {
    /// Finds a player by id.
    #[must_use]
    pub fn player(&self, player_id: u32) -> Option<&PlayerStats> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Finds a player by display name.
    #[must_use]
    pub fn player_by_name(&self, name: &str) -> Option<&PlayerStats> {
        self.players.iter().find(|p| p.name.as_deref() == Some(name))
    }

    /// Returns the players the footer marks as winners.
    pub fn winners(&self) -> impl Iterator<Item = &PlayerStats> {
        self.players.iter().filter(|p| p.outcome == Outcome::Win)
    }

    /// Returns the players the footer marks as losers.
    pub fn losers(&self) -> impl Iterator<Item = &PlayerStats> {
        self.players.iter().filter(|p| p.outcome == Outcome::Loss)
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_counts.values().sum()
    }
}

#[derive(Debug, Clone)]
struct PendingChat {
    frame: u64,
    player_id: Option<u32>,
    text: String,
}

/// Folds events into a [`Game`].
///
/// ```
/// use sgreplay_parser::format::TickRate;
/// use sgreplay_parser::stats::GameBuilder;
///
/// let builder = GameBuilder::new(TickRate::Hz1024);
/// assert_eq!(builder.event_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct GameBuilder {
    tick_rate: TickRate,
    keep_events: bool,
    events: Vec<ReplayEvent>,
    players: BTreeMap<u32, PlayerAccumulator>,
    chat: Vec<PendingChat>,
    entities: EntityTracker,
    event_counts: BTreeMap<&'static str, usize>,
    event_map_name: Option<String>,
    last_frame: u64,
}

impl GameBuilder {
    /// Creates a builder that keeps every event.
    #[must_use]
    pub fn new(tick_rate: TickRate) -> Self {
        GameBuilder {
            tick_rate,
            keep_events: true,
            events: Vec::new(),
            players: BTreeMap::new(),
            chat: Vec::new(),
            entities: EntityTracker::new(),
            event_counts: BTreeMap::new(),
            event_map_name: None,
            last_frame: 0,
        }
    }

    /// Sets whether events are kept on the game.
    #[must_use]
    pub fn keep_events(mut self, keep: bool) -> Self {
        self.keep_events = keep;
        self
    }

    /// Returns the number of events recorded.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_counts.values().sum()
    }

    /// Folds one event.
    pub fn record(&mut self, event: ReplayEvent) {
        *self.event_counts.entry(event.content.type_name()).or_insert(0) += 1;
        self.last_frame = self.last_frame.max(event.frame);

        let player = event.player_id.filter(|&pid| pid != SYSTEM_PLAYER_ID);

        match &event.content {
            EventContent::Command(command) => {
                if let Some(pid) = player {
                    self.players.entry(pid).or_default().record_command(
                        event.frame,
                        self.tick_rate.minute(event.frame),
                        command.ability_id(),
                        command.building_type(),
                    );
                }
                self.entities.record(event.frame, event.player_id, command);
            }
            EventContent::PlayerInfo(info) => {
                if let Some(slot) = info.slot.filter(|&s| s != SYSTEM_PLAYER_ID) {
                    let entry = self.players.entry(slot).or_default();
                    if info.name.is_some() {
                        entry.slot_name.clone_from(&info.name);
                    }
                }
            }
            EventContent::ChatOrProfile(chat) => match &chat.text {
                Some(text) => self.chat.push(PendingChat {
                    frame: event.frame,
                    player_id: event.player_id,
                    text: text.clone(),
                }),
                None => {
                    if let (Some(pid), Some(name)) = (player, &chat.name) {
                        self.players.entry(pid).or_default().profile_name = Some(name.clone());
                    }
                }
            },
            EventContent::MapInfo(info) => {
                if self.event_map_name.is_none() {
                    self.event_map_name.clone_from(&info.map_name);
                }
            }
            EventContent::Spawn(_) | EventContent::Sync(_) | EventContent::Unknown { .. } => {}
        }

        if self.keep_events {
            self.events.push(event);
        }
    }

    /// Completes the fold.
    #[must_use]
    pub fn finish(mut self, meta: ReplayMetadata, assets: Option<&AssetTable>) -> Game {
        let ReplayMetadata {
            header,
            gzip_header,
            trailer,
            footer,
            stream_map_name,
            message_count,
            mut anomalies,
            truncated,
        } = meta;

        if let Some(footer) = &footer {
            for slot in footer.players.iter().filter_map(|p| p.slot) {
                if slot != SYSTEM_PLAYER_ID {
                    self.players.entry(slot).or_default();
                }
            }
        }

        let final_frame = footer.as_ref().and_then(|f| f.final_frame);
        if let Some(final_frame) = final_frame {
            if self.last_frame > final_frame {
                warn!(final_frame, last_frame = self.last_frame, "events run past the footer");
                anomalies.push(Anomaly::new(
                    AnomalyKind::FrameBeyondFooter,
                    format!(
                        "stream reaches tick {} but footer ends at {final_frame}",
                        self.last_frame
                    ),
                ));
            }
        }

        let tick_rate = self.tick_rate;
        let duration_frames = final_frame.unwrap_or(self.last_frame);
        let last_minute = self
            .players
            .values()
            .filter_map(PlayerAccumulator::last_minute)
            .chain([tick_rate.minute(duration_frames)])
            .max()
            .unwrap_or(0);
        let fill_through = if last_minute <= MAX_TIMELINE_MINUTES {
            Some(last_minute)
        } else {
            warn!(last_minute, "tick too far out, timeline left sparse");
            anomalies.push(Anomaly::new(
                AnomalyKind::ImplausibleFrame,
                format!(
                    "timeline reaches minute {last_minute}, past the {MAX_TIMELINE_MINUTES} minute fill limit"
                ),
            ));
            None
        };

        let players: Vec<PlayerStats> = self
            .players
            .iter()
            .map(|(&pid, acc)| {
                let mut stats = acc.finish(pid, tick_rate, duration_frames, fill_through, assets);
                let footer_entry = footer.as_ref().and_then(|f| f.player_by_slot(pid));
                stats.name = acc
                    .slot_name
                    .clone()
                    .or_else(|| acc.profile_name.clone())
                    .or_else(|| footer_entry.and_then(|p| p.name.clone()));

                if let Some(footer) = &footer {
                    stats.outcome = footer.outcome_for(Some(pid), stats.name.as_deref());
                    stats.team = footer_entry
                        .or_else(|| stats.name.as_deref().and_then(|n| footer.player_by_name(n)))
                        .and_then(|p| p.team);
                }
                stats
            })
            .collect();

        let names: BTreeMap<u32, &str> = players
            .iter()
            .filter_map(|p| Some((p.player_id, p.name.as_deref()?)))
            .collect();
        let chat = self
            .chat
            .into_iter()
            .map(|line| ChatMessage {
                frame: line.frame,
                time: tick_rate.format_time(line.frame),
                player_id: line.player_id,
                speaker: match line.player_id {
                    Some(pid) => names
                        .get(&pid)
                        .map_or_else(|| pid.to_string(), |name| (*name).to_string()),
                    None => "unknown".to_string(),
                },
                text: line.text,
            })
            .collect();

        let map_name = footer
            .as_ref()
            .and_then(|f| f.map_name.clone())
            .or(stream_map_name)
            .or(self.event_map_name);

        debug!(
            players = players.len(),
            events = self.event_counts.values().sum::<usize>(),
            duration_frames,
            "game assembled"
        );

        Game {
            header,
            gzip_header,
            trailer,
            match_id: footer.as_ref().and_then(|f| f.match_id.clone()),
            footer,
            map_name,
            tick_rate,
            duration_frames,
            duration_seconds: tick_rate.seconds(duration_frames),
            duration: tick_rate.format_time(duration_frames),
            players,
            chat,
            entities: self.entities.summary(tick_rate, assets),
            event_counts: self
                .event_counts
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            message_count,
            events: self.events,
            anomalies,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AbilityData, ChatOrProfile, Command, MapInfo, PlayerInfo};
    use crate::records::PlayerResult;
    use crate::wire::FieldTree;

    fn metadata(footer: Option<Footer>) -> ReplayMetadata {
        let mut raw = Vec::new();
        raw.extend_from_slice(&crate::format::REPLAY_MAGIC.to_le_bytes());
        for value in [1u32, 20, 83_461, 0] {
            raw.extend_from_slice(&value.to_le_bytes());
        }

        ReplayMetadata {
            header: ReplayHeader::parse(&raw).unwrap(),
            gzip_header: GzipHeader::parse(&[0x1F, 0x8B, 8, 0, 0, 0, 0, 0, 0, 255]).unwrap(),
            trailer: None,
            footer,
            stream_map_name: None,
            message_count: 0,
            anomalies: Vec::new(),
            truncated: false,
        }
    }

    fn footer(final_frame: u64) -> Footer {
        Footer {
            match_id: Some("m-1".into()),
            final_frame: Some(final_frame),
            map_name: Some("DesolateTemple".into()),
            players: vec![
                PlayerResult {
                    slot: Some(1),
                    name: Some("Alice".into()),
                    result: None,
                    team: Some(1),
                    position: None,
                },
                PlayerResult {
                    slot: Some(2),
                    name: Some("Bob".into()),
                    result: Some(1),
                    team: Some(2),
                    position: None,
                },
            ],
            raw: FieldTree::new(),
        }
    }

    fn event(frame: u64, player_id: u32, content: EventContent) -> ReplayEvent {
        ReplayEvent {
            frame,
            player_id: Some(player_id),
            message_index: 0,
            content,
        }
    }

    fn build_command(building_type: u64) -> EventContent {
        EventContent::Command(Command {
            ability: Some(AbilityData {
                ability_id: Some(1),
                building_type: Some(building_type),
                ..AbilityData::default()
            }),
            ..Command::default()
        })
    }

    #[test]
    fn test_footer_drives_outcome_and_duration() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(0, 1, EventContent::PlayerInfo(PlayerInfo { slot: Some(1), name: Some("Alice".into()) })));
        builder.record(event(0, 2, EventContent::PlayerInfo(PlayerInfo { slot: Some(2), name: Some("Bob".into()) })));
        builder.record(event(13_796, 1, build_command(597_044_510)));

        let game = builder.finish(metadata(Some(footer(827_812))), None);

        assert_eq!(game.duration, "13:28");
        assert_eq!(game.map_name.as_deref(), Some("DesolateTemple"));
        assert_eq!(game.match_id.as_deref(), Some("m-1"));
        assert_eq!(game.player(1).unwrap().outcome, Outcome::Win);
        assert_eq!(game.player(2).unwrap().outcome, Outcome::Loss);
        assert_eq!(game.player(2).unwrap().team, Some(2));
        assert_eq!(game.winners().count(), 1);
        assert_eq!(game.player(1).unwrap().build_order[0].time, "0:13");
        assert!(game.anomalies.is_empty());
    }

    #[test]
    fn test_no_footer_means_unknown_outcomes() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(2048, 1, build_command(5)));
        let game = builder.finish(metadata(None), None);

        assert_eq!(game.duration_frames, 2048);
        assert_eq!(game.player(1).unwrap().outcome, Outcome::Unknown);
        assert_eq!(game.player(1).unwrap().team, None);
    }

    #[test]
    fn test_system_player_excluded() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(10, SYSTEM_PLAYER_ID, build_command(5)));
        builder.record(event(10, SYSTEM_PLAYER_ID, EventContent::MapInfo(MapInfo {
            map_name: Some("Boneyard".into()),
            ..MapInfo::default()
        })));
        let game = builder.finish(metadata(None), None);

        assert!(game.players.is_empty());
        assert_eq!(game.map_name.as_deref(), Some("Boneyard"));
        assert_eq!(game.event_counts.get("Command"), Some(&1));
        assert_eq!(game.event_count(), 2);
    }

    #[test]
    fn test_chat_speakers() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(0, 1, EventContent::ChatOrProfile(ChatOrProfile {
            name: Some("Alice".into()),
            ..ChatOrProfile::default()
        })));
        builder.record(event(1024, 1, EventContent::ChatOrProfile(ChatOrProfile {
            text: Some("glhf".into()),
            ..ChatOrProfile::default()
        })));
        builder.record(event(2048, 3, EventContent::ChatOrProfile(ChatOrProfile {
            text: Some("gg".into()),
            ..ChatOrProfile::default()
        })));

        let game = builder.finish(metadata(None), None);
        assert_eq!(game.chat.len(), 2);
        assert_eq!(game.chat[0].speaker, "Alice");
        assert_eq!(game.chat[0].time, "0:01");
        assert_eq!(game.chat[1].speaker, "3");
    }

    #[test]
    fn test_frames_past_footer_recorded() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(5000, 1, build_command(5)));
        let game = builder.finish(metadata(Some(footer(4000))), None);

        assert_eq!(game.duration_frames, 4000);
        assert_eq!(game.anomalies.len(), 1);
        assert_eq!(game.anomalies[0].kind, AnomalyKind::FrameBeyondFooter);
    }

    #[test]
    fn test_far_tick_leaves_timeline_sparse() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(1024, 1, build_command(5)));
        builder.record(event(1 << 45, 1, build_command(6)));
        let game = builder.finish(metadata(None), None);

        let alice = game.player(1).unwrap();
        assert_eq!(alice.apm_timeline.len(), 2);
        assert_eq!(alice.apm_timeline[0].minute, 0);
        assert_eq!(alice.apm_timeline[1].minute, TickRate::Hz1024.minute(1 << 45));
        assert_eq!(game.anomalies.len(), 1);
        assert_eq!(game.anomalies[0].kind, AnomalyKind::ImplausibleFrame);
    }

    #[test]
    fn test_far_footer_frame_leaves_timeline_sparse() {
        let mut builder = GameBuilder::new(TickRate::Hz1024);
        builder.record(event(1024, 1, build_command(5)));
        let game = builder.finish(metadata(Some(footer(u64::MAX))), None);

        assert_eq!(game.player(1).unwrap().apm_timeline.len(), 1);
        assert_eq!(game.anomalies[0].kind, AnomalyKind::ImplausibleFrame);
    }

    #[test]
    fn test_keep_events_flag() {
        let mut keep = GameBuilder::new(TickRate::Hz1024);
        keep.record(event(1, 1, build_command(5)));
        assert_eq!(keep.finish(metadata(None), None).events.len(), 1);

        let mut drop = GameBuilder::new(TickRate::Hz1024).keep_events(false);
        drop.record(event(1, 1, build_command(5)));
        let game = drop.finish(metadata(None), None);
        assert!(game.events.is_empty());
        assert_eq!(game.player(1).unwrap().command_count, 1);
    }
}
