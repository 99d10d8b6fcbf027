//! Options controlling a parse.

use crate::format::{TickRate, TickRateTable};
use crate::wire::json::DEFAULT_RENDER_DEPTH;

/// Options for [`crate::replay::parse_replay`].
///
/// # Example
///
/// ```
/// use sgreplay_parser::config::ParseOptions;
/// use sgreplay_parser::format::TickRate;
///
/// let options = ParseOptions::default()
///     .with_tick_rate(TickRate::Milliseconds)
///     .keep_events(false);
/// assert_eq!(options.tick_rate_for(12_345), TickRate::Milliseconds);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Forces one tick convention regardless of changelist.
    pub tick_rate: Option<TickRate>,
    /// Changelist to tick-convention mapping used when no override is set.
    pub tick_rate_table: TickRateTable,
    /// Whether the full event list is kept on the resulting game.
    pub keep_events: bool,
    /// Nesting limit when rendering field trees as JSON.
    pub render_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            tick_rate: None,
            tick_rate_table: TickRateTable::default(),
            keep_events: true,
            render_depth: DEFAULT_RENDER_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Forces a tick convention.
    #[must_use]
    pub fn with_tick_rate(mut self, rate: TickRate) -> Self {
        self.tick_rate = Some(rate);
        self
    }

    /// Replaces the changelist table.
    #[must_use]
    pub fn with_tick_rate_table(mut self, table: TickRateTable) -> Self {
        self.tick_rate_table = table;
        self
    }

    /// Sets whether the full event list is kept.
    #[must_use]
    pub fn keep_events(mut self, keep: bool) -> Self {
        self.keep_events = keep;
        self
    }

    /// Sets the JSON render depth.
    #[must_use]
    pub fn with_render_depth(mut self, depth: usize) -> Self {
        self.render_depth = depth;
        self
    }

    /// Returns the tick convention for a changelist, honouring the override.
    #[must_use]
    pub fn tick_rate_for(&self, changelist: u32) -> TickRate {
        self.tick_rate
            .unwrap_or_else(|| self.tick_rate_table.for_changelist(changelist))
    }
}
