//! Automation events recorded by the stage controller.
//!
//! Events are buffered inside the controller and handed to the host in batch
//! via [`crate::controller::StageController::drain_events`], typically once
//! per frame for status display and logging sinks.

use crate::id::{CraftId, ItemId};
use crate::stage::Stage;
use crate::time::Timestamp;

/// Why a run stopped before the queue was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The next material is not held in a single inventory slot.
    MaterialShortfall {
        item_id: ItemId,
        name: String,
        needed: u32,
    },
    /// The craft is not visible in the craft log.
    CraftNotUnlocked(CraftId),
    /// The queue references a craft the catalog does not know.
    UnknownCraft(CraftId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationEvent {
    StageChanged {
        from: Stage,
        to: Stage,
        at: Timestamp,
    },
    CraftStarted {
        craft_id: CraftId,
        at: Timestamp,
    },
    DeliveryIssued {
        item_id: ItemId,
        quantity: u32,
        at: Timestamp,
    },
    ContributionConfirmed {
        item_id: ItemId,
        quantity: u32,
        phase_complete: bool,
        at: Timestamp,
    },
    PhaseAdvanced {
        craft_id: CraftId,
        phases_complete: u32,
        at: Timestamp,
    },
    CraftCollected {
        craft_id: CraftId,
        at: Timestamp,
    },
    ConfirmationTimedOut {
        item_id: Option<ItemId>,
        at: Timestamp,
    },
    RunAborted {
        reason: AbortReason,
        at: Timestamp,
    },
}
