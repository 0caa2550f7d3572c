use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a workshop craft in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CraftId(pub u32);

/// Identifies an item (materials, results, currencies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl ItemId {
    /// The null item. Snapshots report it when the panel has no craft loaded.
    pub const NONE: ItemId = ItemId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for CraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "craft#{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}
