//! Ports the host implements for the engine.
//!
//! The engine is written against these traits only. Production hosts bind
//! them to the game client; tests bind them to the fakes in `test_utils`.

use crate::id::ItemId;
use crate::snapshot::{
    CallbackArg, CraftLogSnapshot, CraftSnapshot, Panel, ReadError, ShopListing,
};
use crate::state::{AutomationState, StoreError};

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

/// Reads panels and fires panel interactions.
pub trait UiSnapshotProvider {
    /// Whether the panel is open and fully loaded.
    fn is_ready(&self, panel: Panel) -> bool;

    fn read_craft_snapshot(&self) -> Result<CraftSnapshot, ReadError>;

    fn read_craft_log(&self) -> Result<CraftLogSnapshot, ReadError>;

    fn read_shop_snapshot(&self, panel: Panel) -> Result<ShopListing, ReadError>;

    /// Text of a selectable entry. For [`Panel::SelectYesNo`], index 0 is the
    /// prompt text. Returns `None` past the last entry or when closed.
    fn read_selectable_text(&self, panel: Panel, index: usize) -> Option<String>;

    /// Select a list entry. For [`Panel::SelectYesNo`], index 0 is "yes".
    fn fire_choice(&mut self, panel: Panel, index: usize);

    fn fire_callback(&mut self, panel: Panel, request_id: i32, args: &[CallbackArg]);
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

pub trait InventoryQuery {
    /// Whether at least `count` of the item sit in one inventory slot.
    fn has_in_single_slot(&self, item: ItemId, count: u32) -> bool;

    fn count_total(&self, item: ItemId) -> u32;

    fn free_slot_count(&self) -> u32;

    /// How many more of the item fit on existing partial stacks without a
    /// new slot. Zero means a new slot is needed.
    fn max_batch_size_for(&self, item: ItemId) -> u32;
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Where the player is and what they are doing.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorStatus {
    pub logged_in: bool,
    pub zone: Option<u16>,
    /// Cutscene, loading screen or another input-blocking state.
    pub in_blocking_activity: bool,
    /// Distance to the nearest fabrication station, if one is in range.
    pub distance_to_station: Option<f32>,
    pub job_id: Option<u32>,
}

pub trait ActorEnvironment {
    fn status(&self) -> ActorStatus;

    /// Target and interact with the fabrication station. Returns whether the
    /// interaction was issued.
    fn interact_with_station(&mut self) -> bool;
}

// ---------------------------------------------------------------------------
// Persistence and external automation
// ---------------------------------------------------------------------------

pub trait ConfigStore {
    /// Load the persisted state. `Ok(None)` when nothing was saved yet.
    fn load(&mut self) -> Result<Option<AutomationState>, StoreError>;

    fn save(&mut self, state: &AutomationState) -> Result<(), StoreError>;
}

/// Another automation feature that would answer the same prompts.
pub trait ExternalAutomation: std::fmt::Debug {
    fn name(&self) -> &str;

    /// Disable the feature. Returns its previous enabled flag, or `None` when
    /// the feature is not installed.
    fn disable_if_enabled(&mut self) -> Option<bool>;

    fn enable(&mut self);
}
