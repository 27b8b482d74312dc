#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};

use roomfeed::session::DisplayNameGenerator;
use roomfeed::store::{
    Document, DocumentStore, FieldFilter, Fields, InMemoryDocumentStore, LiveStream, NewDocument,
    StoreError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// In-memory store whose increments and merges can be slowed down,
/// recording every increment delta it was asked to apply
#[derive(Clone)]
pub struct SlowDocumentStore {
    inner: Arc<InMemoryDocumentStore>,
    increment_delay: Arc<RwLock<Duration>>,
    merge_delay: Arc<RwLock<Duration>>,
    increments: Arc<RwLock<Vec<i64>>>,
}

impl SlowDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryDocumentStore::new()),
            increment_delay: Arc::new(RwLock::new(Duration::ZERO)),
            merge_delay: Arc::new(RwLock::new(Duration::ZERO)),
            increments: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_increment_delay(&self, delay: Duration) {
        *self.increment_delay.write().await = delay;
    }

    pub async fn set_merge_delay(&self, delay: Duration) {
        *self.merge_delay.write().await = delay;
    }

    pub async fn increments(&self) -> Vec<i64> {
        self.increments.read().await.clone()
    }

    pub async fn decrements(&self) -> usize {
        self.increments
            .read()
            .await
            .iter()
            .filter(|delta| **delta < 0)
            .count()
    }

    pub fn inner(&self) -> &InMemoryDocumentStore {
        &self.inner
    }
}

#[async_trait]
impl DocumentStore for SlowDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.increments.write().await.push(delta);

        let delay = *self.increment_delay.read().await;
        if !delay.is_zero() {
            sleep(delay).await;
        }

        self.inner.increment(collection, id, field, delta).await
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let delay = *self.merge_delay.read().await;
        if !delay.is_zero() {
            sleep(delay).await;
        }

        self.inner.merge(collection, id, fields).await
    }

    async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError> {
        self.inner.add(collection, document).await
    }

    async fn watch_query(
        &self,
        collection: &str,
        filter: FieldFilter,
    ) -> Result<LiveStream<Vec<Document>>, StoreError> {
        self.inner.watch_query(collection, filter).await
    }

    async fn watch_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<LiveStream<Option<Document>>, StoreError> {
        self.inner.watch_document(collection, id).await
    }
}

/// Hands out display names in order, then falls back to "Guest"
pub struct SequenceNames {
    names: RwLock<VecDeque<String>>,
}

impl SequenceNames {
    pub fn new(names: Vec<&str>) -> Self {
        Self {
            names: RwLock::new(names.into_iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait]
impl DisplayNameGenerator for SequenceNames {
    async fn generate(&self) -> String {
        self.names
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| "Guest".to_string())
    }
}
