//! Ceruleum tanks from the company credit exchange.

use workshop_core::host::{InventoryQuery, UiSnapshotProvider};
use workshop_core::id::ItemId;
use workshop_core::snapshot::{CallbackArg, Panel, ShopListing};

use crate::protocol::ShopAdapter;

pub const CERULEUM_TANK: ItemId = ItemId(10155);
pub const CERULEUM_STACK_SIZE: u32 = 999;

const PURCHASE_REQUEST: i32 = 0;

/// Credit exchange adapter. Company credits are read from the panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CeruleumTankShop;

impl ShopAdapter for CeruleumTankShop {
    fn label(&self) -> &str {
        "ceruleum tanks"
    }

    fn panel(&self) -> Panel {
        Panel::CreditShop
    }

    fn item_id(&self) -> ItemId {
        CERULEUM_TANK
    }

    fn currency(&self, listing: &ShopListing, _inventory: &dyn InventoryQuery) -> u32 {
        listing.currency.unwrap_or(0)
    }

    fn issue_purchase(&self, ui: &mut dyn UiSnapshotProvider, slot_position: usize, quantity: u32) {
        let slot = u32::try_from(slot_position).unwrap_or(u32::MAX);
        ui.fire_callback(
            Panel::CreditShop,
            PURCHASE_REQUEST,
            &[CallbackArg::UInt(slot), CallbackArg::UInt(quantity)],
        );
    }
}

/// Target expressed in whole stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CeruleumTankPlan {
    pub stacks: u32,
    /// Also top up a partially filled stack.
    pub fill_partial_stack: bool,
}

impl CeruleumTankPlan {
    /// Stacks are clamped to `[0, free_slots]`.
    pub fn new(stacks: i64, fill_partial_stack: bool, free_slots: u32) -> Self {
        let stacks = stacks.clamp(0, i64::from(free_slots));
        Self {
            stacks: u32::try_from(stacks).unwrap_or(0),
            fill_partial_stack,
        }
    }

    pub fn missing_items(&self, owned: u32) -> u32 {
        let mut missing = self.stacks.saturating_mul(CERULEUM_STACK_SIZE);
        let partial = owned % CERULEUM_STACK_SIZE;
        if self.fill_partial_stack && partial > 0 {
            missing = missing.saturating_add(CERULEUM_STACK_SIZE - partial);
        }
        missing
    }
}

/// "3 stacks + 120", "1 stack", "0 stacks + 12".
pub fn format_stack_count(count: u32) -> String {
    let stacks = count / CERULEUM_STACK_SIZE;
    let rest = count % CERULEUM_STACK_SIZE;
    let unit = if stacks == 1 { "stack" } else { "stacks" };
    let stacks = group_thousands(stacks);
    if rest == 0 {
        format!("{stacks} {unit}")
    } else {
        format!("{stacks} {unit} + {rest}")
    }
}

fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
