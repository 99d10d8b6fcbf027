//! Entity activity tracking keyed by command `target_id`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::assets::AssetTable;
use crate::events::Command;
use crate::format::TickRate;

/// Number of target types listed per entity.
pub const TOP_TARGET_TYPES: usize = 5;

/// Ability names that identify the entity they are used on or cast by.
const TYPE_INDICATORS: &[(&str, &str)] = &[
    ("HQSpawn", "HQ"),
    ("Shrine_Spawn", "Shrine"),
    ("BarracksSpawn", "Barracks"),
    ("IronVault_Spawn", "IronVault"),
    ("CreationChamber_Spawn", "CreationChamber"),
    ("Arcship_Spawn", "Arcship"),
    ("Conclave_Spawn", "Conclave"),
    ("ArcshipTier1Land", "Arcship"),
    ("ArcshipTier1Liftoff", "Arcship"),
    ("MorphToArcshipTier2", "Arcship"),
    ("MorphToArcshipTier3", "Arcship"),
    ("MorphToHQTier2", "HQ"),
    ("MorphToGreaterShrine", "Shrine"),
    ("WorkerConstructAbilityData", "Worker"),
    ("Imp_Construct", "Imp"),
    ("Celestial_Construct", "Celestial"),
];

const ATTACK_ABILITY: &str = "attackData";

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    first_frame: u64,
    last_frame: u64,
    action_count: usize,
    players: BTreeMap<u32, usize>,
    target_types: HashMap<u64, usize>,
    abilities: HashMap<u64, usize>,
}

/// Accumulates how often each entity is targeted, by whom and with what.
#[derive(Debug, Clone, Default)]
pub struct EntityTracker {
    entities: HashMap<u64, EntityRecord>,
}

/// Activity summary for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    /// Entity id as it appears in command targets.
    pub target_id: u64,
    /// First tick the entity was targeted.
    pub first_frame: u64,
    /// Last tick the entity was targeted.
    pub last_frame: u64,
    /// `m:ss` of `first_frame`.
    pub first_seen: String,
    /// `m:ss` of `last_frame`.
    pub last_seen: String,
    /// Number of commands targeting the entity.
    pub action_count: usize,
    /// Players that targeted the entity.
    pub players: BTreeSet<u32>,
    /// The player that targeted the entity most often.
    pub likely_owner: Option<u32>,
    /// A guess at the entity kind, when asset names allow one.
    pub inferred_type: Option<String>,
    /// Most frequent target types, by name when resolvable.
    pub top_target_types: Vec<(String, usize)>,
}

impl EntityTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a command; commands without a target id are ignored.
    pub fn record(&mut self, frame: u64, player_id: Option<u32>, command: &Command) {
        let Some(target) = &command.target else {
            return;
        };
        let Some(target_id) = target.target_id.filter(|&id| id != 0) else {
            return;
        };

        let entity = self.entities.entry(target_id).or_insert_with(|| EntityRecord {
            first_frame: frame,
            ..EntityRecord::default()
        });
        entity.first_frame = entity.first_frame.min(frame);
        entity.last_frame = entity.last_frame.max(frame);
        entity.action_count += 1;

        if let Some(pid) = player_id {
            *entity.players.entry(pid).or_insert(0) += 1;
        }
        if let Some(target_type) = target.target_type {
            *entity.target_types.entry(target_type).or_insert(0) += 1;
        }
        if let Some(ability_id) = command.ability_id() {
            *entity.abilities.entry(ability_id).or_insert(0) += 1;
        }
    }

    /// Returns the number of distinct entities seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Summarises every entity, most active first.
    #[must_use]
    pub fn summary(&self, tick_rate: TickRate, assets: Option<&AssetTable>) -> Vec<EntitySummary> {
        let mut summaries: Vec<EntitySummary> = self
            .entities
            .iter()
            .map(|(&target_id, entity)| {
                let likely_owner = entity
                    .players
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(&pid, _)| pid);

                EntitySummary {
                    target_id,
                    first_frame: entity.first_frame,
                    last_frame: entity.last_frame,
                    first_seen: tick_rate.format_time(entity.first_frame),
                    last_seen: tick_rate.format_time(entity.last_frame),
                    action_count: entity.action_count,
                    players: entity.players.keys().copied().collect(),
                    likely_owner,
                    inferred_type: assets.and_then(|a| infer_type(entity, a)),
                    top_target_types: top_named(&entity.target_types, assets),
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.action_count
                .cmp(&a.action_count)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        summaries
    }
}

fn top_named(counts: &HashMap<u64, usize>, assets: Option<&AssetTable>) -> Vec<(String, usize)> {
    let mut sorted: Vec<_> = counts.iter().map(|(&id, &n)| (id, n)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
        .into_iter()
        .take(TOP_TARGET_TYPES)
        .map(|(id, n)| {
            let name = assets.map_or_else(|| id.to_string(), |a| a.name_for(id));
            (name, n)
        })
        .collect()
}

fn infer_type(entity: &EntityRecord, assets: &AssetTable) -> Option<String> {
    let indicator = |id: &u64| {
        let name = assets.name(*id)?;
        TYPE_INDICATORS
            .iter()
            .find(|(ability, _)| *ability == name)
            .map(|(_, kind)| (*kind).to_string())
    };

    if let Some(kind) = entity
        .target_types
        .keys()
        .chain(entity.abilities.keys())
        .find_map(indicator)
    {
        return Some(kind);
    }

    let attacks: usize = entity
        .target_types
        .iter()
        .filter(|(id, _)| assets.name(**id) == Some(ATTACK_ABILITY))
        .map(|(_, n)| n)
        .sum();
    (attacks * 2 > entity.action_count).then(|| "CombatUnit".to_string())
}
