use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    codes::RoomCodeGenerator,
    models::{RoomDocument, RoomId, ACTIVE_USERS_FIELD, ROOMS_COLLECTION},
};
use crate::session::SessionRole;
use crate::shared::AppError;
use crate::store::{DocumentStore, Fields, StoreError};

const MAX_CODE_ATTEMPTS: usize = 5;

/// A freshly created room and the capability handed to its creator
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRoom {
    pub room_id: RoomId,
    pub role: SessionRole,
}

/// Service for creating rooms
#[derive(Clone)]
pub struct RoomService {
    store: Arc<dyn DocumentStore>,
    codes: Arc<dyn RoomCodeGenerator>,
}

impl RoomService {
    pub fn new(store: Arc<dyn DocumentStore>, codes: Arc<dyn RoomCodeGenerator>) -> Self {
        Self { store, codes }
    }

    /// Creates a room under a fresh code and returns the organizer role for it
    #[instrument(skip(self))]
    pub async fn create_room(&self) -> Result<CreatedRoom, AppError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let room_id = RoomId::parse(&self.codes.generate())?;
            debug!(room_id = %room_id, attempt = attempt, "Generated room code");

            if self.store.get(ROOMS_COLLECTION, room_id.as_str()).await?.is_some() {
                warn!(room_id = %room_id, "Room code already in use, retrying");
                continue;
            }

            self.store
                .merge(
                    ROOMS_COLLECTION,
                    room_id.as_str(),
                    room_fields(&RoomDocument::new(&room_id))?,
                )
                .await?;

            info!(room_id = %room_id, "Room created successfully");
            return Ok(CreatedRoom {
                room_id,
                role: SessionRole::Organizer,
            });
        }

        Err(AppError::StoreWrite(StoreError::Rejected(format!(
            "no free room code after {} attempts",
            MAX_CODE_ATTEMPTS
        ))))
    }
}

/// Fields written on creation. The presence counter is left out so a
/// code that went live since the existence check keeps its occupancy.
fn room_fields(document: &RoomDocument) -> Result<Fields, AppError> {
    match serde_json::to_value(document) {
        Ok(serde_json::Value::Object(mut fields)) => {
            fields.remove(ACTIVE_USERS_FIELD);
            Ok(fields)
        }
        Ok(_) => Err(AppError::StoreWrite(StoreError::Rejected(
            "room document is not an object".to_string(),
        ))),
        Err(e) => Err(AppError::StoreWrite(StoreError::Rejected(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        Document, FieldFilter, InMemoryDocumentStore, LiveStream, NewDocument,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Store whose reads lag behind: every `get` misses
    struct StaleReads(InMemoryDocumentStore);

    #[async_trait]
    impl DocumentStore for StaleReads {
        async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>, StoreError> {
            Ok(None)
        }

        async fn increment(
            &self,
            collection: &str,
            id: &str,
            field: &str,
            delta: i64,
        ) -> Result<(), StoreError> {
            self.0.increment(collection, id, field, delta).await
        }

        async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
            self.0.merge(collection, id, fields).await
        }

        async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError> {
            self.0.add(collection, document).await
        }

        async fn watch_query(
            &self,
            collection: &str,
            filter: FieldFilter,
        ) -> Result<LiveStream<Vec<Document>>, StoreError> {
            self.0.watch_query(collection, filter).await
        }

        async fn watch_document(
            &self,
            collection: &str,
            id: &str,
        ) -> Result<LiveStream<Option<Document>>, StoreError> {
            self.0.watch_document(collection, id).await
        }
    }

    /// Hands out codes from a fixed list, repeating the last one
    struct ScriptedCodes(Mutex<Vec<&'static str>>);

    impl RoomCodeGenerator for ScriptedCodes {
        fn generate(&self) -> String {
            let mut codes = self.0.lock().unwrap();
            if codes.len() > 1 {
                codes.remove(0).to_string()
            } else {
                codes[0].to_string()
            }
        }
    }

    fn service_with_codes(
        store: Arc<InMemoryDocumentStore>,
        codes: Vec<&'static str>,
    ) -> RoomService {
        RoomService::new(store, Arc::new(ScriptedCodes(Mutex::new(codes))))
    }

    #[tokio::test]
    async fn test_create_room_writes_room_document() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let service = service_with_codes(store.clone(), vec!["ABC123"]);

        let created = service.create_room().await.unwrap();

        assert_eq!(created.room_id.as_str(), "ABC123");
        assert_eq!(created.role, SessionRole::Organizer);

        let room = store.get(ROOMS_COLLECTION, "ABC123").await.unwrap().unwrap();
        assert_eq!(room.get("code"), Some(&json!("ABC123")));
        assert_eq!(room.get(ACTIVE_USERS_FIELD), None);
        assert!(room.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn test_create_room_keeps_live_counter_when_code_is_taken_concurrently() {
        let store = Arc::new(StaleReads(InMemoryDocumentStore::new()));
        store
            .merge(ROOMS_COLLECTION, "ABC123", json!({ "activeUsers": 3 }).as_object().unwrap().clone())
            .await
            .unwrap();
        let service = RoomService::new(
            store.clone(),
            Arc::new(ScriptedCodes(Mutex::new(vec!["ABC123"]))),
        );

        service.create_room().await.unwrap();

        let room = store.0.get(ROOMS_COLLECTION, "ABC123").await.unwrap().unwrap();
        assert_eq!(room.get(ACTIVE_USERS_FIELD), Some(&json!(3)));
        assert_eq!(room.get("code"), Some(&json!("ABC123")));
    }

    #[tokio::test]
    async fn test_create_room_skips_codes_in_use() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let service = service_with_codes(store.clone(), vec!["ABC123", "ABC123", "XYZ999"]);

        let first = service.create_room().await.unwrap();
        let second = service.create_room().await.unwrap();

        assert_eq!(first.room_id.as_str(), "ABC123");
        assert_eq!(second.room_id.as_str(), "XYZ999");
        assert_eq!(store.document_count(ROOMS_COLLECTION).await, 2);
    }

    #[tokio::test]
    async fn test_create_room_gives_up_when_codes_exhausted() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let service = service_with_codes(store.clone(), vec!["ABC123"]);
        service.create_room().await.unwrap();

        let result = service.create_room().await;

        assert!(matches!(result, Err(AppError::StoreWrite(_))));
    }
}
