//! Read-only hash to name resolution.
//!
//! The game ships a `runtime_session.json` whose `archetypes` object maps a
//! numeric key to a `[hash, {"id": ..., "__base_type": ...}]` pair. Replay
//! fields carry either the key or the hash, so both are indexed.
//!
//! The table is loaded once and passed by shared reference; nothing in the
//! parser depends on it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ParserError, Result};

/// One archetype entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEntry {
    /// The archetype key.
    pub key: u64,
    /// The archetype hash, if numeric.
    pub hash: Option<u64>,
    /// Archetype identifier, e.g. `MorphToHQTier2`.
    pub id: String,
    /// Base type name, e.g. `AbilityData`.
    pub base_type: String,
}

/// An immutable lookup table from archetype keys and hashes to entries.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    entries: Vec<AssetEntry>,
    by_key: HashMap<u64, usize>,
    by_hash: HashMap<u64, usize>,
}

impl AssetTable {
    /// Loads a table from a `runtime_session.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`ParserError::IoError`] if the file cannot be read and
    /// [`ParserError::Assets`] if it is not in the expected shape.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&text)?;
        debug!(
            path = %path.as_ref().display(),
            entries = table.len(),
            "loaded asset table"
        );
        Ok(table)
    }

    /// Parses a table from JSON text. A leading byte-order mark is ignored.
    ///
    /// Archetype values that are not a `[hash, object]` pair are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ParserError::Assets`] if the text is not JSON or has no
    /// `archetypes` object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let root: Value = serde_json::from_str(text).map_err(|e| ParserError::Assets {
            reason: e.to_string(),
        })?;

        let archetypes = root
            .get("archetypes")
            .and_then(Value::as_object)
            .ok_or_else(|| ParserError::Assets {
                reason: "missing \"archetypes\" object".to_string(),
            })?;

        let mut table = AssetTable::default();
        let mut skipped = 0usize;
        for (key, value) in archetypes {
            match parse_entry(key, value) {
                Some(entry) => table.insert(entry),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "skipped archetypes without a [hash, object] pair");
        }
        Ok(table)
    }

    /// Adds an entry, replacing any previous entry with the same key.
    pub fn insert(&mut self, entry: AssetEntry) {
        let index = self.entries.len();
        self.by_key.insert(entry.key, index);
        if let Some(hash) = entry.hash {
            self.by_hash.insert(hash, index);
        }
        self.entries.push(entry);
    }

    /// Looks an identifier up by key first, then by hash.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&AssetEntry> {
        self.by_key
            .get(&id)
            .or_else(|| self.by_hash.get(&id))
            .map(|&index| &self.entries[index])
    }

    /// Looks an identifier up by key only.
    #[must_use]
    pub fn by_key(&self, key: u64) -> Option<&AssetEntry> {
        self.by_key.get(&key).map(|&index| &self.entries[index])
    }

    /// Looks an identifier up by hash only.
    #[must_use]
    pub fn by_hash(&self, hash: u64) -> Option<&AssetEntry> {
        self.by_hash.get(&hash).map(|&index| &self.entries[index])
    }

    /// Returns the archetype name, if known.
    #[must_use]
    pub fn name(&self, id: u64) -> Option<&str> {
        self.get(id).map(|e| e.id.as_str())
    }

    /// Returns the archetype name, or the identifier as decimal text.
    #[must_use]
    pub fn name_for(&self, id: u64) -> String {
        self.name(id).map_or_else(|| id.to_string(), str::to_owned)
    }

    /// Returns the number of keyed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Counts entries per base type, most common first.
    #[must_use]
    pub fn base_type_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &index in self.by_key.values() {
            *counts.entry(self.entries[index].base_type.as_str()).or_insert(0) += 1;
        }

        let mut sorted: Vec<_> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sorted
    }
}

fn parse_entry(key: &str, value: &Value) -> Option<AssetEntry> {
    let key = key.parse::<u64>().ok()?;
    let pair = value.as_array()?;
    let info = pair.get(1)?.as_object()?;

    // hashes are 64-bit; negative values are the same bits written signed
    #[allow(clippy::cast_sign_loss)]
    let hash = pair
        .first()
        .and_then(|h| h.as_u64().or_else(|| h.as_i64().map(|v| v as u64)));

    let text = |field: &str| {
        info.get(field)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };

    Some(AssetEntry {
        key,
        hash,
        id: text("id"),
        base_type: text("__base_type"),
    })
}
