//! Parallel parsing of many replays.
//!
//! Each file is parsed independently on the rayon pool; a failure is kept
//! next to its path and never affects other files.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assets::AssetTable;
use crate::config::ParseOptions;
use crate::error::{ParserError, Result};
use crate::replay::parse_file_with_assets;
use crate::stats::{Game, ReplaySummary};

/// File extension of replay files, compared case-insensitively.
pub const REPLAY_EXTENSION: &str = "SGReplay";

/// The outcome of parsing one file.
#[derive(Debug)]
pub struct BatchEntry {
    /// The file that was parsed.
    pub path: PathBuf,
    /// The parsed game or the error that stopped it.
    pub result: Result<Game>,
}

/// Results of a batch run, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input file.
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Returns the games that parsed.
    pub fn games(&self) -> impl Iterator<Item = (&Path, &Game)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().ok().map(|g| (e.path.as_path(), g)))
    }

    /// Returns the files that failed and why.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ParserError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (e.path.as_path(), err)))
    }

    /// Returns the number of files that parsed.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.games().count()
    }

    /// Returns the number of files that failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Aggregates the parsed games.
    #[must_use]
    pub fn summary(&self, player: Option<&str>) -> ReplaySummary {
        ReplaySummary::from_games(self.games().map(|(_, game)| game), player)
    }
}

/// Parses every path in parallel.
#[must_use]
pub fn parse_files<P>(paths: &[P], options: &ParseOptions, assets: Option<&AssetTable>) -> BatchReport
where
    P: AsRef<Path> + Sync,
{
    let entries: Vec<BatchEntry> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = parse_file_with_assets(path, options, assets);
            match &result {
                Ok(game) => debug!(path = %path.display(), events = game.event_count(), "parsed"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to parse"),
            }
            BatchEntry {
                path: path.to_path_buf(),
                result,
            }
        })
        .collect();

    let report = BatchReport { entries };
    info!(
        ok = report.success_count(),
        failed = report.failure_count(),
        "batch complete"
    );
    report
}

/// Lists replay files in a directory, sorted by path.
///
/// # Errors
///
/// Returns [`ParserError::IoError`] if the directory cannot be read.
pub fn find_replays(directory: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut replays = Vec::new();
    collect(directory, recursive, &mut replays)?;
    replays.sort();
    Ok(replays)
}

fn collect(directory: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect(&path, recursive, out)?;
            }
        } else if is_replay(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Returns whether a path has the replay extension.
#[must_use]
pub fn is_replay(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(REPLAY_EXTENSION))
}
