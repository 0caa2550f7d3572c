//! Persisted automation state: the craft queue and the craft in progress.
//!
//! The state is written through [`crate::host::ConfigStore`] on every change
//! so a run interrupted by a crash or logout resumes where it left off.

use crate::catalog::{CatalogError, WorkshopCatalog};
use crate::id::{CraftId, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

fn current_version() -> u32 {
    STATE_VERSION
}

/// A queued craft and how many more times to build it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub craft_id: CraftId,
    pub quantity: u32,
}

impl QueuedItem {
    /// Negative quantities are clamped to zero.
    pub fn new(craft_id: CraftId, quantity: i64) -> Self {
        Self {
            craft_id,
            quantity: clamp_quantity(quantity),
        }
    }
}

pub fn clamp_quantity(quantity: i64) -> u32 {
    quantity.clamp(0, i64::from(u32::MAX)) as u32
}

/// Items delivered so far in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributedItem {
    pub item_id: ItemId,
    pub quantity_complete: u32,
}

/// The craft currently being worked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentItem {
    pub craft_id: CraftId,
    /// The craft was started at the station, so re-entering goes straight to
    /// the branch menu instead of the craft log.
    #[serde(default)]
    pub started_crafting: bool,
    #[serde(default)]
    pub phases_complete: u32,
    #[serde(default)]
    pub contributed_items_in_current_phase: Vec<ContributedItem>,
}

impl CurrentItem {
    pub fn new(craft_id: CraftId) -> Self {
        Self {
            craft_id,
            started_crafting: false,
            phases_complete: 0,
            contributed_items_in_current_phase: Vec::new(),
        }
    }

    pub fn record_contribution(&mut self, item_id: ItemId, quantity: u32) {
        match self
            .contributed_items_in_current_phase
            .iter_mut()
            .find(|entry| entry.item_id == item_id)
        {
            Some(entry) => entry.quantity_complete = entry.quantity_complete.saturating_add(quantity),
            None => self.contributed_items_in_current_phase.push(ContributedItem {
                item_id,
                quantity_complete: quantity,
            }),
        }
    }

    pub fn contributed(&self, item_id: ItemId) -> u32 {
        self.contributed_items_in_current_phase
            .iter()
            .find(|entry| entry.item_id == item_id)
            .map_or(0, |entry| entry.quantity_complete)
    }

    /// Close the current phase. The counter never exceeds `phase_count`.
    pub fn advance_phase(&mut self, phase_count: usize) {
        let limit = u32::try_from(phase_count).unwrap_or(u32::MAX);
        self.phases_complete = (self.phases_complete + 1).min(limit);
        self.contributed_items_in_current_phase.clear();
    }
}

/// Outstanding need for one material across the queue and current craft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialRequirement {
    pub item_id: ItemId,
    pub name: String,
    pub quantity: u32,
}

// ---------------------------------------------------------------------------
// AutomationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationState {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub queue: Vec<QueuedItem>,
    #[serde(default)]
    pub current_item: Option<CurrentItem>,
}

impl Default for AutomationState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            queue: Vec::new(),
            current_item: None,
        }
    }
}

impl AutomationState {
    /// Index of the first queue entry with quantity left.
    pub fn next_queued_index(&self) -> Option<usize> {
        self.queue.iter().position(|entry| entry.quantity > 0)
    }

    /// Take one unit from the entry at `index`. Entries that reach zero stay
    /// in the queue so its composition is unchanged.
    pub fn take_from_queue(&mut self, index: usize) -> Option<CraftId> {
        let entry = self.queue.get_mut(index)?;
        if entry.quantity == 0 {
            return None;
        }
        entry.quantity -= 1;
        Some(entry.craft_id)
    }

    pub fn total_queued(&self) -> u64 {
        self.queue.iter().map(|entry| u64::from(entry.quantity)).sum()
    }

    /// Whether a run has anything to do.
    pub fn has_work(&self) -> bool {
        self.current_item.is_some() || self.total_queued() > 0
    }

    /// Materials still needed by the current craft and every queued craft,
    /// grouped by item and ordered by name.
    ///
    /// Phases already completed and contributions already made in the
    /// current phase are subtracted.
    pub fn required_materials(
        &self,
        catalog: &WorkshopCatalog,
    ) -> Result<Vec<MaterialRequirement>, CatalogError> {
        let mut needed: BTreeMap<(String, ItemId), u64> = BTreeMap::new();
        let mut completed: BTreeMap<ItemId, u64> = BTreeMap::new();

        if let Some(current) = &self.current_item {
            let craft = catalog.require(current.craft_id)?;
            for item in craft.all_items() {
                *needed.entry((item.name.clone(), item.item_id)).or_default() +=
                    u64::from(item.total_quantity());
            }

            let done_phases = (current.phases_complete as usize).min(craft.phase_count());
            for phase in &craft.phases[..done_phases] {
                for item in &phase.items {
                    *completed.entry(item.item_id).or_default() += u64::from(item.total_quantity());
                }
            }
            if done_phases < craft.phase_count() {
                for entry in &current.contributed_items_in_current_phase {
                    *completed.entry(entry.item_id).or_default() += u64::from(entry.quantity_complete);
                }
            }
        }

        for queued in &self.queue {
            let craft = catalog.require(queued.craft_id)?;
            for item in craft.all_items() {
                *needed.entry((item.name.clone(), item.item_id)).or_default() +=
                    u64::from(item.total_quantity()) * u64::from(queued.quantity);
            }
        }

        Ok(needed
            .into_iter()
            .map(|((name, item_id), total)| {
                let done = completed.get(&item_id).copied().unwrap_or(0);
                MaterialRequirement {
                    item_id,
                    name,
                    quantity: u32::try_from(total.saturating_sub(done)).unwrap_or(u32::MAX),
                }
            })
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed state: {0}")]
    Malformed(String),
    #[error("unsupported state version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}
