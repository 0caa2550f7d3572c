//! Workshop Plugin -- the host-facing facade.
//!
//! [`Workshop`] owns the frozen data, the persisted state, the stage
//! controller, both auto-buy shops and the state store. A host wires its own
//! UI, inventory and actor ports into [`HostFrame`] and calls
//! [`Workshop::tick`] once per frame; user commands are plain methods.

pub mod logging;
pub mod status;
pub mod workshop;

pub use status::{CurrentCraftStatus, QueueEntryStatus, WorkshopStatus};
pub use workshop::{CommandError, HostFrame, Workshop};
