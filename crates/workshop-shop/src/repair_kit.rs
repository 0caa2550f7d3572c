//! Grade 6 dark matter from the gil vendor, sized to the clusters on hand.

use workshop_core::host::{InventoryQuery, UiSnapshotProvider};
use workshop_core::id::ItemId;
use workshop_core::snapshot::{CallbackArg, Panel, ShopListing};

use crate::protocol::ShopAdapter;

pub const GRADE_SIX_DARK_MATTER: ItemId = ItemId(10386);
pub const DARK_MATTER_CLUSTER: ItemId = ItemId(10335);
pub const GIL: ItemId = ItemId(1);
/// Dark matter consumed per cluster.
pub const DARK_MATTER_PER_CLUSTER: u32 = 5;

const PURCHASE_REQUEST: i32 = 0;

/// Gil vendor adapter. Only offered while clusters are held.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairKitShop;

impl ShopAdapter for RepairKitShop {
    fn label(&self) -> &str {
        "repair kits"
    }

    fn panel(&self) -> Panel {
        Panel::GilShop
    }

    fn item_id(&self) -> ItemId {
        GRADE_SIX_DARK_MATTER
    }

    fn is_available(&self, inventory: &dyn InventoryQuery) -> bool {
        inventory.count_total(DARK_MATTER_CLUSTER) > 0
    }

    fn currency(&self, _listing: &ShopListing, inventory: &dyn InventoryQuery) -> u32 {
        inventory.count_total(GIL)
    }

    fn issue_purchase(&self, ui: &mut dyn UiSnapshotProvider, slot_position: usize, quantity: u32) {
        let slot = i32::try_from(slot_position).unwrap_or(i32::MAX);
        let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
        ui.fire_callback(
            Panel::GilShop,
            PURCHASE_REQUEST,
            &[CallbackArg::Int(slot), CallbackArg::Int(quantity), CallbackArg::Zero],
        );
    }
}

/// Dark matter still needed to use up `clusters`.
pub fn missing_dark_matter(clusters: u32, owned: u32) -> u32 {
    clusters
        .saturating_mul(DARK_MATTER_PER_CLUSTER)
        .saturating_sub(owned)
}
