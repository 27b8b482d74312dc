use std::sync::Arc;
use thiserror::Error;

use crate::feedback::{FeedbackStream, SubmitError};
use crate::presence::{PresenceError, PresenceTracker};
use crate::room::{MalformedRoomId, RandomRoomCodeGenerator, RoomCodeGenerator, RoomService};
use crate::session::{DisplayNameGenerator, PetNameDisplayNameGenerator, SessionConfig, SessionState};
use crate::store::{DocumentStore, StoreError};
use crate::subscription::SubscriptionError;

/// Shared dependencies for every session, all backed by one document store
#[derive(Clone)]
pub struct RoomServices {
    pub store: Arc<dyn DocumentStore>,
    pub presence: PresenceTracker,
    pub feedback: FeedbackStream,
    pub rooms: RoomService,
    pub names: Arc<dyn DisplayNameGenerator>,
    pub config: SessionConfig,
}

impl RoomServices {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let config = SessionConfig::new();

        Self {
            presence: PresenceTracker::new(Arc::clone(&store)),
            feedback: FeedbackStream::new(Arc::clone(&store)),
            rooms: RoomService::new(Arc::clone(&store), Arc::new(RandomRoomCodeGenerator::new())),
            names: Arc::new(PetNameDisplayNameGenerator::new(config.name_words)),
            config,
            store,
        }
    }

    pub fn with_name_generator(mut self, names: Arc<dyn DisplayNameGenerator>) -> Self {
        self.names = names;
        self
    }

    pub fn with_room_codes(mut self, codes: Arc<dyn RoomCodeGenerator>) -> Self {
        self.rooms = RoomService::new(Arc::clone(&self.store), codes);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed room code: {0}")]
    MalformedRoomId(#[from] MalformedRoomId),

    #[error("Presence error: {0}")]
    Presence(#[from] PresenceError),

    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Feedback error: {0}")]
    Feedback(#[from] SubmitError),

    #[error("Store write failed: {0}")]
    StoreWrite(#[from] StoreError),

    #[error("Session is not active (state: {state})")]
    NotActive { state: SessionState },
}

#[cfg(test)]
pub mod test_utils {
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::store::{
        Document, DocumentStore, FieldFilter, Fields, InMemoryDocumentStore, LiveStream,
        NewDocument, StoreError,
    };

    /// Store operations a `FaultyStore` can be told to fail
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum StoreOp {
        Get,
        Increment,
        Merge,
        Add,
        WatchQuery,
        WatchDocument,
    }

    /// In-memory store with switchable failures and a record of every
    /// increment it was asked to apply
    pub struct FaultyStore {
        inner: InMemoryDocumentStore,
        failures: Mutex<HashMap<StoreOp, StoreError>>,
        increments: Mutex<Vec<i64>>,
    }

    impl FaultyStore {
        pub fn new() -> Self {
            Self {
                inner: InMemoryDocumentStore::new(),
                failures: Mutex::new(HashMap::new()),
                increments: Mutex::new(Vec::new()),
            }
        }

        pub fn inner(&self) -> &InMemoryDocumentStore {
            &self.inner
        }

        pub fn fail(&self, op: StoreOp, error: StoreError) {
            self.failures.lock().unwrap().insert(op, error);
        }

        pub fn heal(&self, op: StoreOp) {
            self.failures.lock().unwrap().remove(&op);
        }

        /// Deltas of every increment call, failed ones included
        pub fn attempted_increments(&self) -> Vec<i64> {
            self.increments.lock().unwrap().clone()
        }

        fn check(&self, op: StoreOp) -> Result<(), StoreError> {
            match self.failures.lock().unwrap().get(&op) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    impl Default for FaultyStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl DocumentStore for FaultyStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
            self.check(StoreOp::Get)?;
            self.inner.get(collection, id).await
        }

        async fn increment(
            &self,
            collection: &str,
            id: &str,
            field: &str,
            delta: i64,
        ) -> Result<(), StoreError> {
            self.increments.lock().unwrap().push(delta);
            self.check(StoreOp::Increment)?;
            self.inner.increment(collection, id, field, delta).await
        }

        async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
            self.check(StoreOp::Merge)?;
            self.inner.merge(collection, id, fields).await
        }

        async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError> {
            self.check(StoreOp::Add)?;
            self.inner.add(collection, document).await
        }

        async fn watch_query(
            &self,
            collection: &str,
            filter: FieldFilter,
        ) -> Result<LiveStream<Vec<Document>>, StoreError> {
            self.check(StoreOp::WatchQuery)?;
            self.inner.watch_query(collection, filter).await
        }

        async fn watch_document(
            &self,
            collection: &str,
            id: &str,
        ) -> Result<LiveStream<Option<Document>>, StoreError> {
            self.check(StoreOp::WatchDocument)?;
            self.inner.watch_document(collection, id).await
        }
    }
}
