// Real-time document store abstraction
//
// The session engine treats the backing store as an opaque publish/subscribe
// document store. `DocumentStore` is the seam; `InMemoryDocumentStore` is the
// in-process implementation used by the demo binary and the tests.

// Public API - what other modules can use
pub use errors::StoreError;
pub use memory::InMemoryDocumentStore;
pub use models::{Document, FieldFilter, Fields, NewDocument, StoreChange};
pub use notifier::ChangeNotifier;

// Internal modules
mod errors;
mod memory;
mod models;
mod notifier;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// A live, never-ending sequence of values pushed by the store
pub type LiveStream<T> = BoxStream<'static, T>;

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Broadcast capacity of each collection's change channel
    pub channel_capacity: usize,
}

impl StoreConfig {
    pub fn new() -> Self {
        let channel_capacity = std::env::var("ROOMFEED_CHANNEL_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|capacity: &usize| *capacity > 0)
            .unwrap_or(100);

        Self { channel_capacity }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Operations the session engine needs from the document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read of a single document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Atomically adds `delta` to a numeric field of an existing document.
    /// Fails with `NotFound` when the document does not exist.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError>;

    /// Creates the document if absent, otherwise merges `fields` into it
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Appends a new document with a store-assigned id
    async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError>;

    /// Live query over documents whose field equals the filter value.
    /// Yields the full matching set immediately and again after every change.
    async fn watch_query(
        &self,
        collection: &str,
        filter: FieldFilter,
    ) -> Result<LiveStream<Vec<Document>>, StoreError>;

    /// Live view of a single document, `None` while it does not exist
    async fn watch_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<LiveStream<Option<Document>>, StoreError>;
}
