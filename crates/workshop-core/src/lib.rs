//! Workshop Core -- the tick-driven automation engine for company workshop
//! crafts.
//!
//! The engine walks a queue of workshop crafts through the station dialogue:
//! travel to the fabrication station, pick the craft from the log, contribute
//! materials phase by phase, advance phases and collect the finished product.
//! Every observation and action goes through host ports, so the whole state
//! machine runs headless against fakes.
//!
//! # Tick Contract
//!
//! The host calls [`controller::StageController::tick`] once per frame. A
//! tick is cheap and never blocks. It:
//!
//! 1. Consumes a pending start/pause request.
//! 2. Checks environmental gating (logged in, zone, blocking activity).
//! 3. Returns early while the current time is before the stage deadline.
//! 4. Runs the handler for the current [`stage::Stage`], which performs at
//!    most one externally observable action.
//!
//! # Key Types
//!
//! - [`catalog::WorkshopCatalog`] -- Immutable craft catalog (frozen at startup).
//! - [`state::AutomationState`] -- Persisted queue and in-progress craft.
//! - [`snapshot::CraftSnapshot`] -- Parsed view of the material delivery panel.
//! - [`host`] -- Port traits the host implements (UI, inventory, actor, store).
//! - [`coordinator::ExternalAutomationCoordinator`] -- Save/restore of
//!   competing automation features.
//! - [`contribution::ContributionEngine`] -- Contribute/confirm sub-protocol.
//! - [`controller::StageController`] -- The stage machine itself.

pub mod catalog;
pub mod contribution;
pub mod controller;
pub mod coordinator;
pub mod event;
pub mod host;
pub mod id;
pub mod settings;
pub mod snapshot;
pub mod stage;
pub mod state;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
