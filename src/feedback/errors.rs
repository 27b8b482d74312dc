use thiserror::Error;

use crate::room::MalformedRoomId;
use crate::store::StoreError;

/// Feedback rejected before reaching the store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Rating {0} is outside 1-5")]
    RatingOutOfRange(i64),

    #[error("Comment is empty")]
    EmptyComment,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    #[error("Invalid feedback: {0}")]
    Validation(#[from] ValidationError),

    #[error("Feedback write failed: {0}")]
    StoreWrite(#[from] StoreError),
}

/// A stored feedback document that could not be read back
#[derive(Debug, Error)]
pub enum InvalidFeedbackDocument {
    #[error("Undecodable feedback document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Feedback document has bad room id: {0}")]
    RoomId(#[from] MalformedRoomId),
}
