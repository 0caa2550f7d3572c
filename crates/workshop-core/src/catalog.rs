use crate::id::{CraftId, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One material slot of a craft phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopCraftItem {
    pub item_id: ItemId,
    pub name: String,
    /// Items handed over by a single contribution step.
    pub quantity_per_set: u32,
    /// Contribution steps required to finish this slot.
    pub sets_required: u32,
}

impl WorkshopCraftItem {
    /// Total items this slot consumes over the whole phase.
    pub fn total_quantity(&self) -> u32 {
        self.quantity_per_set.saturating_mul(self.sets_required)
    }
}

/// A production phase. Phases are contributed to in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopCraftPhase {
    pub name: String,
    pub items: Vec<WorkshopCraftItem>,
}

/// A craftable workshop project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopCraft {
    pub craft_id: CraftId,
    pub result_item: ItemId,
    pub name: String,
    /// Category index in the craft log (the tab the craft lives under).
    pub category: u16,
    /// Craft type index in the craft log (airship, submersible, housing...).
    pub craft_type: u32,
    pub phases: Vec<WorkshopCraftPhase>,
}

impl WorkshopCraft {
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Iterates every material slot across all phases, in phase order.
    pub fn all_items(&self) -> impl Iterator<Item = &WorkshopCraftItem> {
        self.phases.iter().flat_map(|phase| phase.items.iter())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects crafts, then validates them into an immutable [`WorkshopCatalog`].
#[derive(Debug, Default)]
pub struct WorkshopCatalogBuilder {
    crafts: Vec<WorkshopCraft>,
}

impl WorkshopCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_craft(&mut self, craft: WorkshopCraft) -> &mut Self {
        self.crafts.push(craft);
        self
    }

    /// Finalize the catalog. Crafts are kept ordered by id.
    pub fn build(self) -> Result<WorkshopCatalog, CatalogError> {
        let mut crafts = self.crafts;
        crafts.sort_by_key(|craft| craft.craft_id);

        let mut index = HashMap::with_capacity(crafts.len());
        for (position, craft) in crafts.iter().enumerate() {
            if craft.phases.is_empty() {
                return Err(CatalogError::NoPhases(craft.craft_id));
            }
            if index.insert(craft.craft_id, position).is_some() {
                return Err(CatalogError::DuplicateCraft(craft.craft_id));
            }
        }

        Ok(WorkshopCatalog { crafts, index })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable craft catalog. Frozen after build().
#[derive(Debug, Clone, Default)]
pub struct WorkshopCatalog {
    crafts: Vec<WorkshopCraft>,
    index: HashMap<CraftId, usize>,
}

impl WorkshopCatalog {
    pub fn get(&self, id: CraftId) -> Option<&WorkshopCraft> {
        self.index.get(&id).map(|&position| &self.crafts[position])
    }

    pub fn require(&self, id: CraftId) -> Result<&WorkshopCraft, CatalogError> {
        self.get(id).ok_or(CatalogError::UnknownCraft(id))
    }

    pub fn crafts(&self) -> &[WorkshopCraft] {
        &self.crafts
    }

    /// Case-insensitive name search. Empty filters match everything.
    pub fn search(&self, filter: &str) -> Vec<&WorkshopCraft> {
        let needle = filter.trim().to_lowercase();
        self.crafts
            .iter()
            .filter(|craft| needle.is_empty() || craft.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.crafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crafts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown craft: {0}")]
    UnknownCraft(CraftId),
    #[error("craft registered twice: {0}")]
    DuplicateCraft(CraftId),
    #[error("craft has no phases: {0}")]
    NoPhases(CraftId),
}
