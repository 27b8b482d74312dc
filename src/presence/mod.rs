// Best-effort presence tracking
//
// Each attached client holds one lease; the room's `activeUsers` counter is
// the shared, eventually-consistent sum of all leases.

pub use errors::PresenceError;
pub use lease::{ClientId, PresenceLease};
pub use tracker::{participant_count, CounterWrite, PresenceTracker, PresenceWatch, ReleaseOutcome};

mod errors;
mod lease;
mod tracker;
