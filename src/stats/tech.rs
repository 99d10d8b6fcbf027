//! Upgrade and Stormgate reward classification.
//!
//! Both work on resolved ability names, so they only produce output when an
//! [`AssetTable`](crate::assets::AssetTable) is available.

use serde::Serialize;

/// Name fragments that mark an upgrade or research ability.
pub const UPGRADE_KEYWORDS: &[&str] = &["Research", "Upgrade", "MorphTo", "Tier2", "Tier3"];

/// Prefix shared by every Stormgate reward ability.
pub const REWARD_PREFIX: &str = "StormgateAbility";

const REWARD_CREATE_PREFIX: &str = "StormgateAbilityCreate";

const UPGRADE_NAMES: &[(&str, &str)] = &[
    ("MorphToGreaterShrine", "Upgrade to Greater Shrine"),
    ("MorphToElderShrine", "Upgrade to Elder Shrine"),
    ("MorphToHQTier2", "Upgrade to HQ Tier 2"),
    ("MorphToHQTier3", "Upgrade to HQ Tier 3"),
    ("Hellforge_Research", "Hellforge Research"),
    ("MunitionsFactoryResearch", "Munitions Factory Research"),
    ("ResearchLabResearch", "Research Lab Research"),
];

const REWARD_NAMES: &[(&str, &str)] = &[
    ("StormgateAbilityCreateTier1Healer", "Tier 1: Healer"),
    ("StormgateAbilityCreateTier1Ooze", "Tier 1: Ooze"),
    ("StormgateAbilityCreateTier1Frost", "Tier 1: Frost"),
    ("StormgateAbilityCreateTier2Exploder", "Tier 2: Exploder"),
    ("StormgateAbilityCreateTier2Fortress", "Tier 2: Fortress"),
    ("StormgateAbilityCreateTier2Wisp", "Tier 2: Wisp"),
    ("StormgateAbilityCreateTier3ShadowDemon", "Tier 3: Shadow Demon"),
    ("StormgateAbilityCreateTier3Quake", "Tier 3: Quake"),
];

/// One upgrade or reward pick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechEntry {
    /// Ability hash.
    pub ability_id: u64,
    /// Display name.
    pub name: String,
    /// Tick of the command.
    pub frame: u64,
    /// `m:ss` time of the command.
    pub time: String,
}

/// Returns the display name if `ability` is an upgrade or research.
///
/// Stormgate rewards are excluded even when they match a keyword.
#[must_use]
pub fn upgrade_name(ability: &str) -> Option<String> {
    if ability.starts_with(REWARD_PREFIX) {
        return None;
    }
    if !UPGRADE_KEYWORDS.iter().any(|kw| ability.contains(kw)) {
        return None;
    }

    let known = UPGRADE_NAMES
        .iter()
        .find(|(raw, _)| *raw == ability)
        .map(|(_, name)| (*name).to_string());
    Some(known.unwrap_or_else(|| ability.replace('_', " ").replace("MorphTo", "Upgrade to ")))
}

/// Returns the display name if `ability` is a Stormgate reward.
///
/// Unlisted `...Tier<N><Name>` rewards render as `Tier N: Name`.
#[must_use]
pub fn reward_name(ability: &str) -> Option<String> {
    if !ability.starts_with(REWARD_PREFIX) {
        return None;
    }
    if let Some((_, name)) = REWARD_NAMES.iter().find(|(raw, _)| *raw == ability) {
        return Some((*name).to_string());
    }

    let clean = ability.replace(REWARD_CREATE_PREFIX, "");
    Some(split_tier(&clean).map_or(clean.clone(), |(tier, name)| format!("Tier {tier}: {name}")))
}

/// Splits `Tier<digits><rest>` into its parts; `rest` must be non-empty.
fn split_tier(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("Tier")?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits == rest.len() {
        return None;
    }
    Some(rest.split_at(digits))
}
