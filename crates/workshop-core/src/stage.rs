use crate::host::ActorStatus;
use crate::settings::StationSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of the craft automation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    /// Pick the next craft from the queue, or continue the current one.
    Dequeue,
    /// Interact with the fabrication station.
    TravelToStation,
    /// Choose "view company crafting log" from the station menu.
    OpenLog,
    /// Select the craft's type and category tab in the craft log.
    PickCategory,
    /// Select the craft in the craft log.
    PickCraft,
    /// Confirm starting the craft.
    ConfirmCraft,
    /// Inspect the station menu and choose what to do next.
    Branch,
    /// Deliver one batch of the next unfinished material.
    ContributeMaterials,
    /// Answer the delivery confirmation prompt.
    ConfirmDelivery,
    /// Answer the retrieval prompt for the finished product.
    ConfirmCollect,
    /// Release coordination and stop on the next tick.
    RequestStop,
    #[default]
    Stopped,
}

impl Stage {
    /// Whether the stage belongs to a running workflow.
    pub fn is_active(self) -> bool {
        !matches!(self, Stage::Stopped | Stage::RequestStop)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Dequeue => "dequeue",
            Stage::TravelToStation => "travel-to-station",
            Stage::OpenLog => "open-log",
            Stage::PickCategory => "pick-category",
            Stage::PickCraft => "pick-craft",
            Stage::ConfirmCraft => "confirm-craft",
            Stage::Branch => "branch",
            Stage::ContributeMaterials => "contribute-materials",
            Stage::ConfirmDelivery => "confirm-delivery",
            Stage::ConfirmCollect => "confirm-collect",
            Stage::RequestStop => "request-stop",
            Stage::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Why the actor cannot run the workflow right now.
#[derive(Debug, Clone, PartialEq)]
pub enum NotReadyReason {
    NotLoggedIn,
    OutsideWorkshop { zone: Option<u16> },
    BlockingActivity,
    TooFarFromStation { distance: Option<f32> },
    NotACrafter { job_id: Option<u32> },
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::NotLoggedIn => f.write_str("not logged in"),
            NotReadyReason::OutsideWorkshop { .. } => f.write_str("not in the company workshop"),
            NotReadyReason::BlockingActivity => f.write_str("busy"),
            NotReadyReason::TooFarFromStation { .. } => {
                f.write_str("not standing near a fabrication station")
            }
            NotReadyReason::NotACrafter { .. } => f.write_str("not on a crafting job"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Readiness {
    #[default]
    Ready,
    NotReady(NotReadyReason),
}

impl Readiness {
    /// Full precondition check for starting a run.
    pub fn for_start(status: &ActorStatus, station: &StationSettings) -> Self {
        if let Readiness::NotReady(reason) = Self::for_tick(status, station) {
            return Readiness::NotReady(reason);
        }
        match status.job_id {
            Some(job) if station.is_crafter(job) => Readiness::Ready,
            job_id => Readiness::NotReady(NotReadyReason::NotACrafter { job_id }),
        }
    }

    /// Gating applied on every tick of a running workflow. The crafter job
    /// is only checked at start.
    pub fn for_tick(status: &ActorStatus, station: &StationSettings) -> Self {
        if !status.logged_in {
            return Readiness::NotReady(NotReadyReason::NotLoggedIn);
        }
        match status.zone {
            Some(zone) if station.is_workshop_zone(zone) => {}
            zone => return Readiness::NotReady(NotReadyReason::OutsideWorkshop { zone }),
        }
        if status.in_blocking_activity {
            return Readiness::NotReady(NotReadyReason::BlockingActivity);
        }
        match status.distance_to_station {
            Some(distance) if distance < station.max_distance => Readiness::Ready,
            distance => Readiness::NotReady(NotReadyReason::TooFarFromStation { distance }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}
