use async_trait::async_trait;
use futures::stream::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::errors::SubmitError;
use super::models::{FeedbackDraft, FeedbackSnapshot, FEEDBACKS_COLLECTION, ROOM_ID_FIELD};
use crate::room::RoomId;
use crate::store::{DocumentStore, FieldFilter, LiveStream};
use crate::subscription::{drive, SubscriptionError, Unsubscribe};

/// Lazy, infinite, non-restartable sequence of feedback snapshots
pub type FeedbackSnapshots = LiveStream<FeedbackSnapshot>;

/// Trait for components that react to feedback snapshots
#[async_trait]
pub trait FeedbackHandler: Send + Sync {
    /// Called with the full current snapshot after every change
    async fn on_update(&self, room_id: &RoomId, snapshot: FeedbackSnapshot);

    /// Get a human-readable name for this handler (for logging/debugging)
    fn handler_name(&self) -> &'static str;
}

/// Live feedback feed and submission for rooms
#[derive(Clone)]
pub struct FeedbackStream {
    store: Arc<dyn DocumentStore>,
}

impl FeedbackStream {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Opens the room's live query. The first snapshot is the current state.
    #[instrument(skip(self))]
    pub async fn snapshots(&self, room_id: &RoomId) -> Result<FeedbackSnapshots, SubscriptionError> {
        let documents = self
            .store
            .watch_query(
                FEEDBACKS_COLLECTION,
                FieldFilter::eq(ROOM_ID_FIELD, room_id.as_str()),
            )
            .await
            .map_err(|e| SubscriptionError::new("feedback", room_id, e))?;

        let room_id = room_id.clone();
        Ok(documents
            .map(move |documents| FeedbackSnapshot::from_documents(&room_id, documents))
            .boxed())
    }

    /// Delivers every snapshot of the room to `handler` until unsubscribed
    #[instrument(skip(self, handler), fields(handler = handler.handler_name()))]
    pub async fn subscribe(
        &self,
        room_id: &RoomId,
        handler: Arc<dyn FeedbackHandler>,
    ) -> Result<Unsubscribe, SubscriptionError> {
        let snapshots = self.snapshots(room_id).await?;

        info!(room_id = %room_id, "Subscribed to feedback");

        let handler_room = room_id.clone();
        Ok(drive("feedback", room_id, snapshots, move |snapshot| {
            let handler = Arc::clone(&handler);
            let room_id = handler_room.clone();
            async move { handler.on_update(&room_id, snapshot).await }
        }))
    }

    /// Validates and appends one feedback event. Nothing is written when
    /// validation fails.
    #[instrument(skip(self, comment))]
    pub async fn submit(
        &self,
        room_id: &RoomId,
        author_name: &str,
        rating: i64,
        comment: &str,
    ) -> Result<(), SubmitError> {
        let draft = FeedbackDraft::new(rating, comment).map_err(|e| {
            debug!(room_id = %room_id, error = %e, "Feedback rejected");
            e
        })?;

        let id = self
            .store
            .add(FEEDBACKS_COLLECTION, draft.into_document(room_id, author_name))
            .await?;

        info!(room_id = %room_id, feedback_id = %id, rating = rating, "Feedback submitted");
        Ok(())
    }
}
