//! Millisecond timestamps supplied by the host clock.
//!
//! The engine never reads a clock itself: every tick receives `now` from the
//! host, which keeps the stage machine deterministic under test.

use serde::{Deserialize, Serialize};

/// A point in host time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);
    /// A deadline that is never reached.
    pub const NEVER: Timestamp = Timestamp(u64::MAX);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// The timestamp `millis` after this one. Saturates at [`Timestamp::NEVER`].
    pub fn after(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Whether this deadline has been reached at `now`.
    pub fn is_due(self, now: Timestamp) -> bool {
        now >= self
    }
}
