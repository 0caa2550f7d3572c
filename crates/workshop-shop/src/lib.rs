//! Workshop Shop -- repeat-purchase automation for stackable consumables.
//!
//! [`protocol::PurchaseProtocol`] is a small state machine that keeps buying
//! batches from a shop panel until a desired owned quantity is reached. What
//! differs between shops (which panel, which item, where the currency comes
//! from, how the buy callback is encoded) is supplied by a
//! [`protocol::ShopAdapter`]:
//!
//! - [`ceruleum::CeruleumTankShop`] -- ceruleum tanks for company credits.
//! - [`repair_kit::RepairKitShop`] -- grade 6 dark matter for gil.

pub mod ceruleum;
pub mod protocol;
pub mod repair_kit;

pub use ceruleum::{CERULEUM_TANK, CeruleumTankPlan, CeruleumTankShop, format_stack_count};
pub use protocol::{
    PurchaseError, PurchaseProtocol, PurchaseState, PurchaseStep, ShopAdapter, ShopObservation,
};
pub use repair_kit::{DARK_MATTER_CLUSTER, GRADE_SIX_DARK_MATTER, RepairKitShop, missing_dark_matter};
