//! Format constants and time conventions for SGReplay files.
//!
//! Every replay starts with a fixed 20-byte little-endian header whose first
//! word is [`REPLAY_MAGIC`]. Game time inside the event stream is counted in
//! ticks; the tick rate is a per-build convention captured by [`TickRate`]
//! and selected through a [`TickRateTable`].
//!
//! # Example
//!
//! ```
//! use sgreplay_parser::format::{TickRate, TickRateTable};
//!
//! let table = TickRateTable::default();
//! let rate = table.for_changelist(80_000);
//! assert_eq!(rate, TickRate::Hz1024);
//! assert_eq!(rate.format_time(827_812), "13:28");
//! ```

use serde::Serialize;

/// The magic number every replay carries in its first four bytes.
pub const REPLAY_MAGIC: u32 = 0xE3B0_A49D;

/// Size of the fixed container header.
pub const HEADER_SIZE: usize = 20;

/// Lowest header version this parser understands.
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Highest header version this parser understands.
pub const MAX_SUPPORTED_VERSION: u32 = 16;

/// Player id used by the engine for system-issued messages.
pub const SYSTEM_PLAYER_ID: u32 = 64;

/// Convention for converting event-stream ticks into wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickRate {
    /// 1024 ticks per second. Matches every replay observed so far.
    #[default]
    Hz1024,
    /// One tick per millisecond.
    Milliseconds,
}

impl TickRate {
    /// Returns the number of ticks per second.
    #[must_use]
    pub const fn ticks_per_second(self) -> u32 {
        match self {
            TickRate::Hz1024 => 1024,
            TickRate::Milliseconds => 1000,
        }
    }

    /// Converts a tick count into seconds.
    ///
    /// ```
    /// use sgreplay_parser::format::TickRate;
    ///
    /// let secs = TickRate::Hz1024.seconds(13_796);
    /// assert!((secs - 13.47).abs() < 0.01);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds(self, ticks: u64) -> f64 {
        ticks as f64 / f64::from(self.ticks_per_second())
    }

    /// Returns the in-game minute a tick count falls into.
    #[must_use]
    pub fn minute(self, ticks: u64) -> u64 {
        ticks / u64::from(self.ticks_per_second()) / 60
    }

    /// Formats a tick count as `m:ss`, rounded to the nearest second.
    ///
    /// Minutes are not padded and may exceed 59.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn format_time(self, ticks: u64) -> String {
        let total = self.seconds(ticks).round() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }
}

/// A changelist range mapped to a tick convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRateRange {
    /// First changelist (inclusive).
    pub first: u32,
    /// Last changelist (inclusive).
    pub last: u32,
    /// The convention used by builds in the range.
    pub rate: TickRate,
}

/// Maps game builds (changelists) to tick conventions.
///
/// Ranges are checked in insertion order; the first match wins and
/// anything unmatched falls back to the default rate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickRateTable {
    ranges: Vec<TickRateRange>,
    default: TickRate,
}

impl TickRateTable {
    /// Creates a table with no ranges and the given fallback.
    #[must_use]
    pub fn with_default(default: TickRate) -> Self {
        TickRateTable {
            ranges: Vec::new(),
            default,
        }
    }

    /// Adds a changelist range.
    #[must_use]
    pub fn with_range(mut self, first: u32, last: u32, rate: TickRate) -> Self {
        self.ranges.push(TickRateRange { first, last, rate });
        self
    }

    /// Returns the convention for a changelist.
    #[must_use]
    pub fn for_changelist(&self, changelist: u32) -> TickRate {
        self.ranges
            .iter()
            .find(|r| (r.first..=r.last).contains(&changelist))
            .map_or(self.default, |r| r.rate)
    }

    /// Returns the configured ranges.
    #[must_use]
    pub fn ranges(&self) -> &[TickRateRange] {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================
    // TickRate tests
    // ========================

    #[test]
    fn test_seconds_1024hz() {
        let secs = TickRate::Hz1024.seconds(13_796);
        assert!((secs - 13.48).abs() < 0.01, "got {secs}");
    }

    #[test]
    fn test_format_time_rounds_to_nearest_second() {
        assert_eq!(TickRate::Hz1024.format_time(827_812), "13:28");
        assert_eq!(TickRate::Hz1024.format_time(13_796), "0:13");
        assert_eq!(TickRate::Hz1024.format_time(0), "0:00");
        // 1.5 s rounds up
        assert_eq!(TickRate::Hz1024.format_time(1_536), "0:02");
    }

    #[test]
    fn test_format_time_minutes_unpadded_past_an_hour() {
        assert_eq!(TickRate::Milliseconds.format_time(3_723_000), "62:03");
    }

    #[test]
    fn test_minute_bucket() {
        assert_eq!(TickRate::Hz1024.minute(61_439), 0);
        assert_eq!(TickRate::Hz1024.minute(61_440), 1);
        assert_eq!(TickRate::Milliseconds.minute(120_000), 2);
    }

    // ========================
    // TickRateTable tests
    // ========================

    #[test]
    fn test_table_default_is_1024hz() {
        let table = TickRateTable::default();
        assert_eq!(table.for_changelist(0), TickRate::Hz1024);
        assert_eq!(table.for_changelist(u32::MAX), TickRate::Hz1024);
    }

    #[test]
    fn test_table_first_matching_range_wins() {
        let table = TickRateTable::default()
            .with_range(100, 200, TickRate::Milliseconds)
            .with_range(150, 300, TickRate::Hz1024);

        assert_eq!(table.for_changelist(99), TickRate::Hz1024);
        assert_eq!(table.for_changelist(100), TickRate::Milliseconds);
        assert_eq!(table.for_changelist(175), TickRate::Milliseconds);
        assert_eq!(table.for_changelist(250), TickRate::Hz1024);
        assert_eq!(table.ranges().len(), 2);
    }

    #[test]
    fn test_table_custom_default() {
        let table = TickRateTable::with_default(TickRate::Milliseconds);
        assert_eq!(table.for_changelist(5), TickRate::Milliseconds);
    }
}
