// Library crate for the room feedback session engine
// This file exposes the public API for integration tests and the demo binary

pub mod feedback;
pub mod presence;
pub mod room;
pub mod session;
pub mod shared;
pub mod stats;
pub mod store;
pub mod subscription;

// Re-export commonly used types for easier access in tests
pub use feedback::{FeedbackEvent, FeedbackSnapshot, FeedbackStream};
pub use presence::{participant_count, ClientId, PresenceLease, PresenceTracker, ReleaseOutcome};
pub use room::{CreatedRoom, RoomId, RoomService};
pub use session::{DisconnectSignal, RoomSession, RoomView, SessionConfig, SessionRole, SessionState};
pub use shared::{AppError, RoomServices};
pub use stats::{aggregate, AggregateStats, Suggestion};
pub use store::{DocumentStore, InMemoryDocumentStore, StoreConfig, StoreError};
pub use subscription::{SubscriptionError, Unsubscribe};
