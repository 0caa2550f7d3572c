//! Serde structs for the on-disk data files.
//!
//! Ids are the game's numeric ids. Names for craft materials come from the
//! items file and are resolved by the loader.

use serde::Deserialize;

// ===========================================================================
// Items
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub id: u32,
    pub name: String,
}

// ===========================================================================
// Workshop crafts
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CraftData {
    pub id: u32,
    pub result_item: u32,
    pub name: String,
    #[serde(default)]
    pub category: u16,
    #[serde(default)]
    pub craft_type: u32,
    pub phases: Vec<PhaseData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseData {
    pub name: String,
    pub items: Vec<PhaseItemData>,
}

/// A phase material, either `(item, quantity_per_set, sets_required)` or the
/// full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PhaseItemData {
    Short(u32, u32, u32),
    Full {
        item: u32,
        quantity_per_set: u32,
        sets_required: u32,
    },
}

impl PhaseItemData {
    pub fn item(&self) -> u32 {
        match *self {
            PhaseItemData::Short(item, _, _) | PhaseItemData::Full { item, .. } => item,
        }
    }

    pub fn quantity_per_set(&self) -> u32 {
        match *self {
            PhaseItemData::Short(_, quantity, _) => quantity,
            PhaseItemData::Full {
                quantity_per_set, ..
            } => quantity_per_set,
        }
    }

    pub fn sets_required(&self) -> u32 {
        match *self {
            PhaseItemData::Short(_, _, sets) => sets,
            PhaseItemData::Full { sets_required, .. } => sets_required,
        }
    }
}

// ===========================================================================
// Recipes
// ===========================================================================

/// An ingredient, either `(item, amount)` or `{ item, amount }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    Short(u32, u32),
    Full { item: u32, amount: u32 },
}

impl IngredientData {
    pub fn item(&self) -> u32 {
        match *self {
            IngredientData::Short(item, _) | IngredientData::Full { item, .. } => item,
        }
    }

    pub fn amount(&self) -> u32 {
        match *self {
            IngredientData::Short(_, amount) | IngredientData::Full { amount, .. } => amount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub result: u32,
    #[serde(default = "default_yield")]
    pub amount_result: u32,
    pub ingredients: Vec<IngredientData>,
}

fn default_yield() -> u32 {
    1
}

// ===========================================================================
// Vendors
// ===========================================================================

/// Which vendors sell an item.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorData {
    pub item: u32,
    pub vendors: Vec<u32>,
}
