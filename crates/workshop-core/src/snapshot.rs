//! Parsed, immutable views of the game panels the engine reads.
//!
//! The host parses raw panel values into these types. A panel that is not
//! loaded yet is [`ReadError::NotReady`]; a panel whose value layout differs
//! from what the parser expects is [`ReadError::ShapeMismatch`], which the
//! engine treats as a hard read failure rather than guessing indices.

use crate::id::{CraftId, ItemId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// The game panels the engine observes or drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Panel {
    /// Generic list menu (station interaction, branch menu).
    SelectString,
    /// Yes/no confirmation prompt.
    SelectYesNo,
    /// Company craft log.
    CraftLog,
    /// Material delivery panel of the fabrication station.
    MaterialDelivery,
    /// Company credit exchange.
    CreditShop,
    /// Regular gil vendor.
    GilShop,
}

impl Panel {
    /// Host-side addon name of the panel.
    pub fn addon_name(self) -> &'static str {
        match self {
            Panel::SelectString => "SelectString",
            Panel::SelectYesNo => "SelectYesno",
            Panel::CraftLog => "CompanyCraftRecipeNoteBook",
            Panel::MaterialDelivery => "CompanyCraftMaterial",
            Panel::CreditShop => "FreeCompanyCreditShop",
            Panel::GilShop => "Shop",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.addon_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("panel {0} is not ready")]
    NotReady(Panel),
    #[error("panel {panel} has {observed} values, expected {expected}")]
    ShapeMismatch {
        panel: Panel,
        expected: usize,
        observed: usize,
    },
}

/// A typed argument for a panel callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackArg {
    Int(i32),
    UInt(u32),
    /// An empty trailing argument.
    Zero,
}

// ---------------------------------------------------------------------------
// Material delivery
// ---------------------------------------------------------------------------

/// Value count of a fully loaded material delivery panel.
pub const MATERIAL_DELIVERY_VALUE_COUNT: usize = 157;

/// One material row of the delivery panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftSnapshotItem {
    pub item_id: ItemId,
    pub name: String,
    /// Items handed over per contribution step.
    pub count_per_step: u32,
    pub count_nq: u32,
    pub count_hq: u32,
    pub steps_complete: u32,
    pub steps_total: u32,
    pub finished: bool,
}

impl CraftSnapshotItem {
    pub fn is_finished(&self) -> bool {
        self.finished || self.steps_complete >= self.steps_total
    }
}

/// Parsed state of the material delivery panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftSnapshot {
    pub result_item: ItemId,
    /// Phases completed so far, as reported by the panel.
    pub steps_complete: u32,
    /// Total number of phases.
    pub steps_total: u32,
    pub items: Vec<CraftSnapshotItem>,
}

impl CraftSnapshot {
    /// A snapshot with a null result item means the panel has no craft loaded.
    pub fn is_loaded(&self) -> bool {
        !self.result_item.is_none()
    }

    pub fn is_phase_complete(&self) -> bool {
        self.items.iter().all(CraftSnapshotItem::is_finished)
    }

    /// The current phase is the last one and every row is finished.
    pub fn is_craft_complete(&self) -> bool {
        self.steps_complete + 1 == self.steps_total && self.is_phase_complete()
    }

    /// The first row that still needs contributions, with its row index.
    pub fn first_unfinished(&self) -> Option<(usize, &CraftSnapshotItem)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| !item.is_finished())
    }

    pub fn item_mut(&mut self, item_id: ItemId) -> Option<&mut CraftSnapshotItem> {
        self.items.iter_mut().find(|item| item.item_id == item_id)
    }
}

// ---------------------------------------------------------------------------
// Craft log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftLogEntry {
    pub craft_id: CraftId,
    pub name: String,
}

/// The crafts visible in the currently selected craft log category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CraftLogSnapshot {
    pub entries: Vec<CraftLogEntry>,
}

impl CraftLogSnapshot {
    pub fn contains(&self, craft_id: CraftId) -> bool {
        self.entries.iter().any(|entry| entry.craft_id == craft_id)
    }
}

// ---------------------------------------------------------------------------
// Shops
// ---------------------------------------------------------------------------

/// One item for sale in a shop panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSnapshot {
    /// Row index inside the shop panel, used to address purchases.
    pub slot_position: usize,
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: u32,
    pub owned_quantity: u32,
}

/// Parsed shop panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopListing {
    /// Currency shown by the panel itself, when it shows one.
    pub currency: Option<u32>,
    pub items: Vec<ShopSnapshot>,
}

impl ShopListing {
    pub fn find(&self, item_id: ItemId) -> Option<&ShopSnapshot> {
        self.items.iter().find(|item| item.item_id == item_id)
    }
}
