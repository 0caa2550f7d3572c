//! Tunable automation settings: where the station is, how long to wait
//! between actions and which prompt texts to answer.
//!
//! Every field has a default, so a settings file only needs to list the
//! values it overrides.

use serde::{Deserialize, Serialize};

/// Zones that contain a company workshop.
pub const WORKSHOP_ZONES: [u16; 5] = [423, 424, 425, 653, 984];

/// Disciples of the Hand job range.
pub const CRAFTER_JOBS: std::ops::RangeInclusive<u32> = 8..=15;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    pub station: StationSettings,
    pub timings: Timings,
    pub prompts: PromptSettings,
    pub shops: ShopSettings,
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationSettings {
    pub zones: Vec<u16>,
    /// Interaction range to the fabrication station, exclusive.
    pub max_distance: f32,
    pub min_job: u32,
    pub max_job: u32,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            zones: WORKSHOP_ZONES.to_vec(),
            max_distance: 5.0,
            min_job: *CRAFTER_JOBS.start(),
            max_job: *CRAFTER_JOBS.end(),
        }
    }
}

impl StationSettings {
    pub fn is_workshop_zone(&self, zone: u16) -> bool {
        self.zones.contains(&zone)
    }

    pub fn is_crafter(&self, job: u32) -> bool {
        (self.min_job..=self.max_job).contains(&job)
    }
}

// ---------------------------------------------------------------------------
// Timings
// ---------------------------------------------------------------------------

/// Delays between actions, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// After choosing "contribute materials".
    pub contribute_delay_ms: u64,
    /// After advancing or completing a phase (covers the cutscene).
    pub advance_delay_ms: u64,
    /// After choosing "collect finished product".
    pub collect_delay_ms: u64,
    /// After issuing a delivery, before looking for its confirmation.
    pub delivery_delay_ms: u64,
    /// After a confirmed delivery, before the next contribution.
    pub confirm_to_contribute_ms: u64,
    /// After a confirmed delivery that completed the phase.
    pub phase_complete_delay_ms: u64,
    /// After navigating the craft log.
    pub log_navigation_ms: u64,
    /// How long a delivery may wait for its confirmation prompt.
    pub confirmation_watchdog_ms: u64,
    /// How long the branch step may wait for a recognizable menu.
    pub branch_watchdog_ms: u64,
    /// Back-off when the delivery panel is open with no craft loaded.
    pub read_retry_ms: u64,
    /// Settle time after an observed shop purchase.
    pub shop_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            contribute_delay_ms: 1_000,
            advance_delay_ms: 3_000,
            collect_delay_ms: 250,
            delivery_delay_ms: 500,
            confirm_to_contribute_ms: 1_000,
            phase_complete_delay_ms: 500,
            log_navigation_ms: 100,
            confirmation_watchdog_ms: 20_000,
            branch_watchdog_ms: 10_000,
            read_retry_ms: 1_000,
            shop_settle_ms: 250,
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// How a prompt or menu entry is recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPattern {
    Exact(String),
    Prefix(String),
    Contains(String),
    Surrounded { prefix: String, suffix: String },
}

impl TextPattern {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            TextPattern::Exact(expected) => text == expected,
            TextPattern::Prefix(prefix) => text.starts_with(prefix.as_str()),
            TextPattern::Contains(needle) => text.contains(needle.as_str()),
            TextPattern::Surrounded { prefix, suffix } => {
                text.len() >= prefix.len() + suffix.len()
                    && text.starts_with(prefix.as_str())
                    && text.ends_with(suffix.as_str())
            }
        }
    }
}

/// Prompt texts are compared with every line break turned into a single
/// space.
pub fn normalize_prompt(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub open_log: TextPattern,
    pub confirm_craft: TextPattern,
    pub contribute: TextPattern,
    pub advance_phase: TextPattern,
    pub complete_construction: TextPattern,
    pub collect_product: TextPattern,
    pub confirm_delivery: TextPattern,
    pub high_quality_warning: TextPattern,
    pub retrieve_product: TextPattern,
    pub confirm_purchase: TextPattern,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            open_log: TextPattern::Exact("View company crafting log.".into()),
            confirm_craft: TextPattern::Prefix("Craft ".into()),
            contribute: TextPattern::Prefix("Contribute materials.".into()),
            advance_phase: TextPattern::Prefix("Advance to the next phase of production.".into()),
            complete_construction: TextPattern::Prefix("Complete the construction of".into()),
            collect_product: TextPattern::Exact("Collect finished product.".into()),
            confirm_delivery: TextPattern::Surrounded {
                prefix: "Contribute".into(),
                suffix: "to the company project?".into(),
            },
            high_quality_warning: TextPattern::Contains("high-quality".into()),
            retrieve_product: TextPattern::Prefix("Retrieve".into()),
            confirm_purchase: TextPattern::Prefix("Purchase".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSettings {
    pub enable_ceruleum_tanks: bool,
    pub enable_repair_kits: bool,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            enable_ceruleum_tanks: true,
            enable_repair_kits: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_requires_full_match() {
        let pattern = TextPattern::Exact("Collect finished product.".into());
        assert!(pattern.matches("Collect finished product."));
        assert!(!pattern.matches("Collect finished product. "));
    }

    #[test]
    fn surrounded_pattern_needs_both_ends() {
        let pattern = PromptSettings::default().confirm_delivery;
        assert!(pattern.matches("Contribute 3 Lumber to the company project?"));
        assert!(!pattern.matches("Contribute 3 Lumber?"));
        assert!(!pattern.matches("Deliver 3 Lumber to the company project?"));
    }

    #[test]
    fn surrounded_pattern_rejects_overlapping_ends() {
        let pattern = TextPattern::Surrounded {
            prefix: "abc".into(),
            suffix: "cde".into(),
        };
        assert!(!pattern.matches("abcde"));
        assert!(pattern.matches("abc cde"));
    }

    #[test]
    fn normalize_turns_line_breaks_into_spaces() {
        assert_eq!(
            normalize_prompt("Contribute 3 Lumber\nto the company project?"),
            "Contribute 3 Lumber to the company project?"
        );
        assert_eq!(normalize_prompt("Retrieve the\r\nBow?"), "Retrieve the Bow?");
    }

    #[test]
    fn normalized_delivery_prompt_still_matches() {
        let prompts = PromptSettings::default();
        let text = normalize_prompt("Contribute 2 Iron Ingot\nto the company project?");
        assert!(prompts.confirm_delivery.matches(&text));
        assert!(!prompts.high_quality_warning.matches(&text));
    }

    #[test]
    fn station_defaults_cover_workshop_zones_and_crafters() {
        let station = StationSettings::default();
        assert!(station.is_workshop_zone(423));
        assert!(!station.is_workshop_zone(129));
        assert!(station.is_crafter(8));
        assert!(station.is_crafter(15));
        assert!(!station.is_crafter(16));
    }

    #[test]
    fn default_timings() {
        let timings = Timings::default();
        assert_eq!(timings.advance_delay_ms, 3_000);
        assert_eq!(timings.confirmation_watchdog_ms, 20_000);
    }
}
