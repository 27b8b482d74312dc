// Public API - what other modules can use
pub use codes::{RandomRoomCodeGenerator, RoomCodeGenerator};
pub use models::{MalformedRoomId, RoomDocument, RoomId};
pub use service::{CreatedRoom, RoomService};

// Internal modules
mod codes;
pub mod models;
mod service;
