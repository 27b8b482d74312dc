#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;
use std::sync::Arc;
use tokio::time::Duration;

use roomfeed::room::models::{ACTIVE_USERS_FIELD, ROOMS_COLLECTION};
use roomfeed::{DocumentStore, RoomServices, RoomSession, SessionConfig, SessionRole};

use super::mocks::{SequenceNames, SlowDocumentStore};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: SlowDocumentStore,
    pub services: RoomServices,
    pub room_code: String,
}

pub struct TestSetupBuilder {
    names: Vec<&'static str>,
    release_timeout: Duration,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            names: vec![],
            release_timeout: Duration::from_millis(500),
        }
    }

    pub fn with_names(mut self, names: Vec<&'static str>) -> Self {
        self.names = names;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }

    /// Builds the services and creates one room to play in
    pub async fn build(self) -> TestSetup {
        let store = SlowDocumentStore::new();

        let services = RoomServices::new(Arc::new(store.clone()))
            .with_name_generator(Arc::new(SequenceNames::new(self.names)))
            .with_config(SessionConfig {
                release_timeout: self.release_timeout,
                name_words: 2,
            });

        let created = services.rooms.create_room().await.unwrap();

        TestSetup {
            store,
            services,
            room_code: created.room_id.to_string(),
        }
    }
}

impl TestSetup {
    pub async fn enter(&self, role: SessionRole) -> RoomSession {
        RoomSession::enter(&self.services, &self.room_code, role)
            .await
            .unwrap()
    }

    pub async fn enter_organizer(&self) -> RoomSession {
        self.enter(SessionRole::Organizer).await
    }

    pub async fn enter_participant(&self) -> RoomSession {
        self.enter(SessionRole::Participant).await
    }

    /// Raw presence counter as stored
    pub async fn active_users(&self) -> Option<i64> {
        self.store
            .get(ROOMS_COLLECTION, &self.room_code)
            .await
            .unwrap()
            .and_then(|document| document.get(ACTIVE_USERS_FIELD).and_then(Value::as_i64))
    }
}
