// Room-scoped feedback feed
//
// Feedback documents are append-only. Consumers see the whole current set
// for a room on every change, never a diff.

pub use errors::{InvalidFeedbackDocument, SubmitError, ValidationError};
pub use models::{FeedbackDraft, FeedbackEvent, FeedbackSnapshot, RATING_RANGE};
pub use stream::{FeedbackHandler, FeedbackSnapshots, FeedbackStream};

mod errors;
pub mod models;
mod stream;
