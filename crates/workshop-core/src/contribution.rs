//! The contribute/confirm sub-protocol of the material delivery panel.
//!
//! A contribution hands one step's worth of the first unfinished material to
//! the panel. The game answers with a confirmation prompt, or first with a
//! high-quality warning when the slot holds HQ items. Confirming updates the
//! local snapshot so the controller can tell whether the phase is done
//! without waiting for the panel to refresh.

use crate::host::{InventoryQuery, UiSnapshotProvider};
use crate::id::ItemId;
use crate::settings::PromptSettings;
use crate::snapshot::{CallbackArg, CraftSnapshot, Panel};

/// A delivery that was issued and awaits its confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    /// Row index in the delivery panel.
    pub index: usize,
    pub item_id: ItemId,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributeOutcome {
    Issued(PendingDelivery),
    /// Nothing left to deliver in this phase.
    PhaseComplete,
    Shortfall {
        item_id: ItemId,
        name: String,
        needed: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The HQ warning was accepted; the real confirmation follows.
    HighQualityWarning,
    Confirmed {
        item_id: ItemId,
        quantity: u32,
        phase_complete: bool,
    },
    Waiting,
    TimedOut,
}

#[derive(Debug, Default)]
pub struct ContributionEngine {
    pending: Option<PendingDelivery>,
}

impl ContributionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingDelivery> {
        self.pending.as_ref()
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Issue a delivery for the first unfinished material.
    ///
    /// The whole step must come from one inventory slot; anything else is a
    /// shortfall and no callback is fired.
    pub fn contribute(
        &mut self,
        snapshot: &CraftSnapshot,
        inventory: &dyn InventoryQuery,
        ui: &mut dyn UiSnapshotProvider,
    ) -> ContributeOutcome {
        let Some((index, item)) = snapshot.first_unfinished() else {
            return ContributeOutcome::PhaseComplete;
        };

        if !inventory.has_in_single_slot(item.item_id, item.count_per_step) {
            return ContributeOutcome::Shortfall {
                item_id: item.item_id,
                name: item.name.clone(),
                needed: item.count_per_step,
            };
        }

        let row = u32::try_from(index).unwrap_or(u32::MAX);
        ui.fire_callback(
            Panel::MaterialDelivery,
            0,
            &[
                CallbackArg::UInt(row),
                CallbackArg::UInt(item.count_per_step),
                CallbackArg::Zero,
            ],
        );

        let pending = PendingDelivery {
            index,
            item_id: item.item_id,
            name: item.name.clone(),
            count: item.count_per_step,
        };
        self.pending = Some(pending.clone());
        ContributeOutcome::Issued(pending)
    }

    /// Answer the prompt that follows a delivery.
    ///
    /// `prompt` is the normalized yes/no prompt text, if one is open. The HQ
    /// warning is checked before the generic confirmation because both can
    /// share the same leading text.
    pub fn confirm(
        &mut self,
        snapshot: &mut CraftSnapshot,
        prompt: Option<&str>,
        prompts: &PromptSettings,
        ui: &mut dyn UiSnapshotProvider,
        timed_out: bool,
    ) -> ConfirmOutcome {
        if let Some(text) = prompt {
            if prompts.high_quality_warning.matches(text) {
                ui.fire_choice(Panel::SelectYesNo, 0);
                return ConfirmOutcome::HighQualityWarning;
            }
            if prompts.confirm_delivery.matches(text) {
                if let Some(pending) = self.pending.take() {
                    ui.fire_choice(Panel::SelectYesNo, 0);
                    if let Some(item) = snapshot.item_mut(pending.item_id) {
                        item.steps_complete += 1;
                    }
                    return ConfirmOutcome::Confirmed {
                        item_id: pending.item_id,
                        quantity: pending.count,
                        phase_complete: snapshot.is_phase_complete(),
                    };
                }
            }
        }

        if timed_out {
            self.pending = None;
            return ConfirmOutcome::TimedOut;
        }
        ConfirmOutcome::Waiting
    }
}
