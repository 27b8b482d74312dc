use chrono::Utc;
use futures::stream::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use strum_macros::Display;
use tracing::{debug, info, instrument, warn};

use super::errors::PresenceError;
use super::lease::{ClientId, PresenceLease};
use crate::room::{
    models::{ACTIVE_USERS_FIELD, ROOMS_COLLECTION},
    RoomId,
};
use crate::store::{Document, DocumentStore, Fields, LiveStream, StoreError};
use crate::subscription::SubscriptionError;

/// Live raw `activeUsers` values for one room
pub type PresenceWatch = LiveStream<i64>;

/// The two branches of "ensure and increment" on the presence counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum CounterWrite {
    /// Atomic +1 on an existing counter
    #[strum(serialize = "increment")]
    Increment,
    /// Room document missing (create it, then increment) or counter
    /// unusable (overwrite it with 1)
    #[strum(serialize = "initialize")]
    InitializeThenSet,
}

/// What happened when a lease was released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReleaseOutcome {
    Released,
    AlreadyReleased,
    /// The decrement did not reach the store; the lease is still spent
    Failed,
    /// No lease was held yet; one still being acquired is released on arrival
    NotAcquired,
}

/// Displayed participant count: the organizer's own lease is not a
/// participant, and stale counters never show below zero
pub fn participant_count(raw: i64) -> u64 {
    raw.saturating_sub(1).max(0) as u64
}

/// Tracks live occupancy of rooms through the shared presence counter
#[derive(Clone)]
pub struct PresenceTracker {
    store: Arc<dyn DocumentStore>,
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Adds one to the room's counter and hands back the lease for it
    #[instrument(skip(self))]
    pub async fn attach(
        &self,
        room_id: &RoomId,
        client_id: ClientId,
    ) -> Result<PresenceLease, PresenceError> {
        let write = self.ensure_and_increment(room_id).await?;

        info!(
            room_id = %room_id,
            client_id = %client_id,
            via = %write,
            "Presence lease acquired"
        );

        Ok(PresenceLease::new(room_id.clone(), client_id, write))
    }

    /// Releases the lease. Only the first call decrements; failures are
    /// logged and reported in the outcome, never returned as errors.
    #[instrument(skip(self, lease), fields(room_id = %lease.room_id(), client_id = %lease.client_id()))]
    pub async fn detach(&self, lease: &PresenceLease) -> ReleaseOutcome {
        if !lease.begin_release() {
            debug!("Presence lease already released");
            return ReleaseOutcome::AlreadyReleased;
        }

        match self
            .store
            .increment(
                ROOMS_COLLECTION,
                lease.room_id().as_str(),
                ACTIVE_USERS_FIELD,
                -1,
            )
            .await
        {
            Ok(()) => {
                let held_ms = (Utc::now() - lease.acquired_at()).num_milliseconds();
                info!(held_ms = held_ms, "Presence lease released");
                ReleaseOutcome::Released
            }
            Err(e) => {
                warn!(error = %e, "Failed to decrement presence counter");
                ReleaseOutcome::Failed
            }
        }
    }

    /// Live raw counter for a room; a missing room or field reads as 0
    #[instrument(skip(self))]
    pub async fn observe(&self, room_id: &RoomId) -> Result<PresenceWatch, PresenceError> {
        let documents = self
            .store
            .watch_document(ROOMS_COLLECTION, room_id.as_str())
            .await
            .map_err(|e| SubscriptionError::new("presence", room_id, e))?;

        Ok(documents
            .map(|document| active_users(document.as_ref()))
            .boxed())
    }

    async fn ensure_and_increment(&self, room_id: &RoomId) -> Result<CounterWrite, StoreError> {
        match self.increment(room_id).await {
            Ok(()) => Ok(CounterWrite::Increment),
            Err(e) if e.is_recoverable() => {
                debug!(room_id = %room_id, error = %e, "Presence counter unusable, initializing");
                self.initialize(room_id, &e).await?;
                Ok(CounterWrite::InitializeThenSet)
            }
            Err(e) => Err(e),
        }
    }

    async fn increment(&self, room_id: &RoomId) -> Result<(), StoreError> {
        self.store
            .increment(ROOMS_COLLECTION, room_id.as_str(), ACTIVE_USERS_FIELD, 1)
            .await
    }

    /// A missing room gets a document without a counter and the atomic
    /// increment is retried, so concurrent first attaches are all counted.
    /// Only an unusable counter is overwritten.
    async fn initialize(&self, room_id: &RoomId, cause: &StoreError) -> Result<(), StoreError> {
        let mut fields = Fields::new();
        fields.insert("code".to_string(), json!(room_id.as_str()));

        if let StoreError::InvalidField { .. } = cause {
            fields.insert(ACTIVE_USERS_FIELD.to_string(), json!(1));
            return self
                .store
                .merge(ROOMS_COLLECTION, room_id.as_str(), fields)
                .await;
        }

        self.store
            .merge(ROOMS_COLLECTION, room_id.as_str(), fields)
            .await?;
        self.increment(room_id).await
    }
}

fn active_users(document: Option<&Document>) -> i64 {
    document
        .and_then(|d| d.get(ACTIVE_USERS_FIELD))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}
