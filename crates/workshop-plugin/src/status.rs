//! Read model for status displays.

use workshop_core::id::CraftId;
use workshop_core::stage::{Readiness, Stage};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkshopStatus {
    pub stage: Stage,
    pub readiness: Readiness,
    pub current_craft: Option<CurrentCraftStatus>,
    pub queue: Vec<QueueEntryStatus>,
    /// Label of the shop with an active auto-buy.
    pub auto_buy: Option<String>,
}

impl WorkshopStatus {
    pub fn is_running(&self) -> bool {
        self.stage.is_active()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentCraftStatus {
    pub craft_id: CraftId,
    pub name: String,
    pub started_crafting: bool,
    pub phases_complete: u32,
    pub phase_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntryStatus {
    pub craft_id: CraftId,
    pub name: String,
    pub quantity: u32,
}
