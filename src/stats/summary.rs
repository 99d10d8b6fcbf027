//! Read-only aggregation across many games.

use std::collections::BTreeMap;

use serde::Serialize;

use super::game::Game;
use super::player::PlayerStats;
use crate::records::Outcome;

/// Number of buildings that make up an opening.
pub const OPENING_LENGTH: usize = 3;

/// Win/loss tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Games counted.
    pub games: usize,
    /// Games won.
    pub wins: usize,
    /// Games lost.
    pub losses: usize,
}

impl Record {
    fn add(&mut self, outcome: Outcome) {
        self.games += 1;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Unknown => {}
        }
    }

    /// Returns wins over decided games, if any game was decided.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn win_rate(&self) -> Option<f64> {
        let decided = self.wins + self.losses;
        (decided > 0).then(|| self.wins as f64 / decided as f64)
    }
}

/// Aggregate statistics over a set of games.
///
/// With a focus player only games they appear in are counted, and every
/// tally is from their point of view. Without one, per-map and
/// per-changelist tallies count games only and openings cover every player.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    /// The focus player, if any.
    pub player: Option<String>,
    /// Games counted.
    pub total_games: usize,
    /// Overall record of the focus player.
    pub record: Record,
    /// Mean game length in seconds.
    pub average_duration_seconds: Option<f64>,
    /// Tallies by map name.
    pub maps: BTreeMap<String, Record>,
    /// Tallies by changelist.
    pub changelists: BTreeMap<u32, Record>,
    /// Tallies by player name.
    pub players: BTreeMap<String, Record>,
    /// Tallies by opponent name (focus player only).
    pub opponents: BTreeMap<String, Record>,
    /// Tallies by opening (first buildings joined with ` > `).
    pub openings: BTreeMap<String, Record>,
}

impl ReplaySummary {
    /// Aggregates `games`, optionally from one player's point of view.
    #[must_use]
    pub fn from_games<'a, I>(games: I, player: Option<&str>) -> Self
    where
        I: IntoIterator<Item = &'a Game>,
    {
        let mut summary = ReplaySummary {
            player: player.map(str::to_owned),
            ..ReplaySummary::default()
        };
        let mut total_seconds = 0.0;

        for game in games {
            let focus = match player {
                Some(name) => match game.player_by_name(name) {
                    Some(p) => Some(p),
                    None => continue,
                },
                None => None,
            };

            summary.total_games += 1;
            total_seconds += game.duration_seconds;

            let map = game.map_name.clone().unwrap_or_else(|| "Unknown".to_string());
            let outcome = focus.map_or(Outcome::Unknown, |p| p.outcome);
            summary.maps.entry(map).or_default().add(outcome);
            summary
                .changelists
                .entry(game.header.changelist)
                .or_default()
                .add(outcome);

            for p in &game.players {
                summary.players.entry(p.display_name()).or_default().add(p.outcome);
            }

            match focus {
                Some(me) => {
                    summary.record.add(me.outcome);
                    for opponent in game
                        .players
                        .iter()
                        .filter(|p| p.player_id != me.player_id && (me.team.is_none() || p.team != me.team))
                    {
                        summary
                            .opponents
                            .entry(opponent.display_name())
                            .or_default()
                            .add(me.outcome);
                    }
                    if let Some(opening) = opening(me) {
                        summary.openings.entry(opening).or_default().add(me.outcome);
                    }
                }
                None => {
                    for p in &game.players {
                        if let Some(opening) = opening(p) {
                            summary.openings.entry(opening).or_default().add(p.outcome);
                        }
                    }
                }
            }
        }

        if summary.total_games > 0 {
            #[allow(clippy::cast_precision_loss)]
            let games = summary.total_games as f64;
            summary.average_duration_seconds = Some(total_seconds / games);
        }
        summary
    }

    /// Returns openings sorted by how often they were played.
    #[must_use]
    pub fn top_openings(&self, limit: usize) -> Vec<(&str, Record)> {
        let mut sorted: Vec<_> = self
            .openings
            .iter()
            .map(|(name, record)| (name.as_str(), *record))
            .collect();
        sorted.sort_by(|a, b| b.1.games.cmp(&a.1.games).then_with(|| a.0.cmp(b.0)));
        sorted.truncate(limit);
        sorted
    }
}

fn opening(player: &PlayerStats) -> Option<String> {
    if player.build_order.is_empty() {
        return None;
    }
    Some(
        player
            .build_order
            .iter()
            .take(OPENING_LENGTH)
            .map(super::player::BuildOrderEntry::label)
            .collect::<Vec<_>>()
            .join(" > "),
    )
}
