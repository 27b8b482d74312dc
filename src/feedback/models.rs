use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::warn;

use super::errors::{InvalidFeedbackDocument, ValidationError};
use crate::room::RoomId;
use crate::store::{Document, Fields, NewDocument};

/// Collection holding every room's feedback documents
pub const FEEDBACKS_COLLECTION: &str = "feedbacks";
/// Field live queries filter on
pub const ROOM_ID_FIELD: &str = "roomId";
/// Field the store resolves to its commit time
pub const TIMESTAMP_FIELD: &str = "timestamp";

pub const RATING_RANGE: RangeInclusive<i64> = 1..=5;

/// Wire shape of a stored feedback document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackDocument {
    room_id: String,
    username: String,
    rating: i64,
    comment: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// One immutable rating + comment submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub id: String,
    pub room_id: RoomId,
    pub author_name: String,
    /// May be out of range when read from an untrusted writer
    pub rating: i64,
    pub comment: String,
    /// `None` until the store has resolved the commit timestamp
    pub submitted_at: Option<DateTime<Utc>>,
}

impl FeedbackEvent {
    pub fn from_document(document: &Document) -> Result<Self, InvalidFeedbackDocument> {
        let wire: FeedbackDocument =
            serde_json::from_value(Value::Object(document.fields.clone()))?;

        Ok(Self {
            id: document.id.clone(),
            room_id: RoomId::parse(&wire.room_id)?,
            author_name: wire.username,
            rating: wire.rating,
            comment: wire.comment,
            submitted_at: wire.timestamp,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.submitted_at.is_none()
    }
}

/// Validated feedback, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    rating: i64,
    comment: String,
}

impl FeedbackDraft {
    /// Rating must be 1-5 and the comment non-empty once trimmed.
    /// The trimmed comment is what gets stored.
    pub fn new(rating: i64, comment: &str) -> Result<Self, ValidationError> {
        if !RATING_RANGE.contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }

        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ValidationError::EmptyComment);
        }

        Ok(Self {
            rating,
            comment: comment.to_string(),
        })
    }

    pub fn rating(&self) -> i64 {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub(crate) fn into_document(self, room_id: &RoomId, author_name: &str) -> NewDocument {
        let mut fields = Fields::new();
        fields.insert(ROOM_ID_FIELD.to_string(), json!(room_id.as_str()));
        fields.insert("username".to_string(), json!(author_name));
        fields.insert("rating".to_string(), json!(self.rating));
        fields.insert("comment".to_string(), json!(self.comment));

        NewDocument::new(fields).with_server_timestamp(TIMESTAMP_FIELD)
    }
}

/// Every feedback event currently visible for one room, in arrival order,
/// at most once per event id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeedbackSnapshot {
    events: Vec<FeedbackEvent>,
}

impl FeedbackSnapshot {
    /// Builds a snapshot from raw query results. Duplicates, other rooms'
    /// documents and unreadable documents are dropped.
    pub fn from_documents(room_id: &RoomId, documents: Vec<Document>) -> Self {
        let mut seen = HashSet::new();
        let mut events = Vec::with_capacity(documents.len());

        for document in &documents {
            if !seen.insert(document.id.as_str()) {
                continue;
            }
            match FeedbackEvent::from_document(document) {
                Ok(event) if &event.room_id == room_id => events.push(event),
                Ok(event) => {
                    warn!(
                        room_id = %room_id,
                        document_id = %document.id,
                        other_room = %event.room_id,
                        "Dropping feedback for another room"
                    );
                }
                Err(e) => {
                    warn!(
                        room_id = %room_id,
                        document_id = %document.id,
                        error = %e,
                        "Skipping unreadable feedback document"
                    );
                }
            }
        }

        Self { events }
    }

    pub fn events(&self) -> &[FeedbackEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedbackEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Vec<FeedbackEvent>> for FeedbackSnapshot {
    fn from(events: Vec<FeedbackEvent>) -> Self {
        Self { events }
    }
}
