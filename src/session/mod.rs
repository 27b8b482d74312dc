// Per-visit room session
//
// A RoomSession ties one client's presence lease, feedback subscription and
// presence observer to a single lifecycle with a single teardown.

// Public API - what other modules can use
pub use config::SessionConfig;
pub use disconnect::DisconnectSignal;
pub use generators::{DisplayNameGenerator, PetNameDisplayNameGenerator};
pub use models::{DetachTrigger, RoomView, SessionRole, SessionState};
pub use room_session::RoomSession;

// Internal modules
mod config;
mod disconnect;
mod generators;
pub mod models;
mod room_session;
