//! Per-player statistics.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::tech::{reward_name, upgrade_name, TechEntry};
use crate::assets::AssetTable;
use crate::format::TickRate;
use crate::records::Outcome;

/// Longest game, in minutes, whose APM timeline is zero-filled. Past this
/// only minutes with commands get a bucket.
pub const MAX_TIMELINE_MINUTES: u64 = 24 * 60;

/// One construction order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOrderEntry {
    /// Building type hash.
    pub building_type: u64,
    /// Building name, when an asset table resolved it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tick of the order.
    pub frame: u64,
    /// Seconds since game start.
    pub seconds: f64,
    /// `m:ss` time of the order.
    pub time: String,
}

impl BuildOrderEntry {
    /// Returns the resolved name, or the hash as text.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.building_type.to_string())
    }
}

/// Commands issued during one in-game minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApmBucket {
    /// Minute index, starting at 0.
    pub minute: u64,
    /// Commands issued in that minute.
    pub actions: usize,
}

/// Statistics for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    /// Player id (1-5).
    pub player_id: u32,
    /// Display name.
    pub name: Option<String>,
    /// Team number from the footer.
    pub team: Option<u32>,
    /// Result from the footer.
    pub outcome: Outcome,
    /// Number of commands issued.
    pub command_count: usize,
    /// Commands per minute over the whole game.
    pub apm: f64,
    /// Commands per in-game minute.
    pub apm_timeline: Vec<ApmBucket>,
    /// Construction orders in stream order.
    pub build_order: Vec<BuildOrderEntry>,
    /// Upgrades and research, first use of each ability only.
    pub upgrades: Vec<TechEntry>,
    /// Stormgate rewards, first use of each ability only.
    pub rewards: Vec<TechEntry>,
}

impl PlayerStats {
    /// Returns the display name, or the player id as text.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.player_id.to_string())
    }
}

/// Running totals for one player while events are folded.
#[derive(Debug, Clone, Default)]
pub(crate) struct PlayerAccumulator {
    pub(crate) slot_name: Option<String>,
    pub(crate) profile_name: Option<String>,
    commands: usize,
    per_minute: BTreeMap<u64, usize>,
    buildings: Vec<(u64, u64)>,
    first_abilities: Vec<(u64, u64)>,
    seen_abilities: HashSet<u64>,
}

impl PlayerAccumulator {
    pub(crate) fn record_command(
        &mut self,
        frame: u64,
        minute: u64,
        ability_id: Option<u64>,
        building_type: Option<u64>,
    ) {
        self.commands += 1;
        *self.per_minute.entry(minute).or_insert(0) += 1;

        if let Some(building) = building_type {
            self.buildings.push((building, frame));
        }
        if let Some(ability) = ability_id {
            if self.seen_abilities.insert(ability) {
                self.first_abilities.push((ability, frame));
            }
        }
    }

    pub(crate) fn last_minute(&self) -> Option<u64> {
        self.per_minute.keys().next_back().copied()
    }

    /// Produces the final statistics. `name`, `team` and `outcome` are
    /// resolved by the caller, which sees the footer.
    ///
    /// With `fill_through` set, the timeline has a bucket for every minute
    /// up to it; without, only for minutes with commands.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn finish(
        &self,
        player_id: u32,
        tick_rate: TickRate,
        duration_frames: u64,
        fill_through: Option<u64>,
        assets: Option<&AssetTable>,
    ) -> PlayerStats {
        let minutes = tick_rate.seconds(duration_frames) / 60.0;
        let apm = if minutes > 0.0 {
            self.commands as f64 / minutes
        } else {
            0.0
        };

        let apm_timeline = match fill_through {
            Some(last_minute) => (0..=last_minute)
                .map(|minute| ApmBucket {
                    minute,
                    actions: self.per_minute.get(&minute).copied().unwrap_or(0),
                })
                .collect(),
            None => self
                .per_minute
                .iter()
                .map(|(&minute, &actions)| ApmBucket { minute, actions })
                .collect(),
        };

        let build_order = self
            .buildings
            .iter()
            .map(|&(building_type, frame)| BuildOrderEntry {
                building_type,
                name: assets.and_then(|a| a.name(building_type)).map(str::to_owned),
                frame,
                seconds: tick_rate.seconds(frame),
                time: tick_rate.format_time(frame),
            })
            .collect();

        let (upgrades, rewards) = match assets {
            Some(assets) => self.tech(assets, tick_rate),
            None => (Vec::new(), Vec::new()),
        };

        PlayerStats {
            player_id,
            name: None,
            team: None,
            outcome: Outcome::Unknown,
            command_count: self.commands,
            apm,
            apm_timeline,
            build_order,
            upgrades,
            rewards,
        }
    }

    fn tech(&self, assets: &AssetTable, tick_rate: TickRate) -> (Vec<TechEntry>, Vec<TechEntry>) {
        let mut upgrades = Vec::new();
        let mut rewards = Vec::new();

        for &(ability_id, frame) in &self.first_abilities {
            let Some(ability) = assets.name(ability_id) else {
                continue;
            };
            let entry = |name| TechEntry {
                ability_id,
                name,
                frame,
                time: tick_rate.format_time(frame),
            };

            if let Some(name) = reward_name(ability) {
                rewards.push(entry(name));
            } else if let Some(name) = upgrade_name(ability) {
                upgrades.push(entry(name));
            }
        }

        upgrades.sort_by_key(|u| u.frame);
        rewards.sort_by_key(|r| r.frame);
        (upgrades, rewards)
    }
}
