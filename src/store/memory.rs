use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    models::{Document, FieldFilter, Fields, NewDocument, StoreChange},
    notifier::ChangeNotifier,
    DocumentStore, LiveStream, StoreConfig, StoreError,
};

type Collections = Arc<RwLock<HashMap<String, Vec<Document>>>>;

/// In-memory implementation of DocumentStore for development and testing.
///
/// Documents keep insertion order within a collection, so live queries
/// deliver results in arrival order.
pub struct InMemoryDocumentStore {
    collections: Collections,
    notifier: ChangeNotifier,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates a new empty store using environment configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::new())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            notifier: ChangeNotifier::new(config.channel_capacity),
            last_timestamp: Mutex::new(None),
        }
    }

    /// Number of documents currently stored in a collection
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Number of live watchers attached to a collection
    pub async fn watcher_count(&self, collection: &str) -> usize {
        self.notifier.watcher_count(collection).await
    }

    /// Commit timestamp that never goes backwards, even if the clock does
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Utc::now();
        let timestamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(timestamp);
        timestamp
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(read_document(&self.collections, collection, id).await)
    }

    #[instrument(skip(self))]
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        let change = {
            let mut collections = self.collections.write().await;
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.iter_mut().find(|d| d.id == id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;

            let current = match document.fields.get(field) {
                None | Some(Value::Null) => 0,
                Some(value) => value.as_i64().ok_or_else(|| StoreError::InvalidField {
                    field: field.to_string(),
                })?,
            };
            document
                .fields
                .insert(field.to_string(), Value::from(current + delta));

            debug!(collection = %collection, id = %id, field = %field, value = current + delta, "Field incremented");

            StoreChange {
                document_id: id.to_string(),
                fields: document.fields.clone(),
            }
        };

        self.notifier.publish(collection, change).await;
        Ok(())
    }

    #[instrument(skip(self, fields))]
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let change = {
            let mut collections = self.collections.write().await;
            let documents = collections.entry(collection.to_string()).or_default();

            let merged = match documents.iter_mut().find(|d| d.id == id) {
                Some(existing) => {
                    existing.fields.extend(fields);
                    existing.fields.clone()
                }
                None => {
                    debug!(collection = %collection, id = %id, "Creating document on merge");
                    documents.push(Document::new(id, fields.clone()));
                    fields
                }
            };

            StoreChange {
                document_id: id.to_string(),
                fields: merged,
            }
        };

        self.notifier.publish(collection, change).await;
        Ok(())
    }

    #[instrument(skip(self, document))]
    async fn add(&self, collection: &str, document: NewDocument) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let mut fields = document.fields;

        if let Some(field) = document.server_timestamp_field {
            let timestamp = self
                .next_timestamp()
                .to_rfc3339_opts(SecondsFormat::Micros, true);
            fields.insert(field, Value::String(timestamp));
        }

        {
            let mut collections = self.collections.write().await;
            collections
                .entry(collection.to_string())
                .or_default()
                .push(Document::new(id.clone(), fields.clone()));
        }

        debug!(collection = %collection, id = %id, "Document added");

        self.notifier
            .publish(
                collection,
                StoreChange {
                    document_id: id.clone(),
                    fields,
                },
            )
            .await;
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn watch_query(
        &self,
        collection: &str,
        filter: FieldFilter,
    ) -> Result<LiveStream<Vec<Document>>, StoreError> {
        // Subscribe before the first read so no write can fall in between
        let receiver = self.notifier.subscribe(collection).await;
        let initial = read_matching(&self.collections, collection, &filter).await;

        let collections = Arc::clone(&self.collections);
        let collection = collection.to_string();
        let relevant_filter = filter.clone();

        Ok(live_stream(
            initial,
            receiver,
            move |change| relevant_filter.matches(&change.fields),
            move || {
                let collections = Arc::clone(&collections);
                let collection = collection.clone();
                let filter = filter.clone();
                async move { read_matching(&collections, &collection, &filter).await }
            },
        ))
    }

    #[instrument(skip(self))]
    async fn watch_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<LiveStream<Option<Document>>, StoreError> {
        let receiver = self.notifier.subscribe(collection).await;
        let initial = read_document(&self.collections, collection, id).await;

        let collections = Arc::clone(&self.collections);
        let collection = collection.to_string();
        let id = id.to_string();
        let relevant_id = id.clone();

        Ok(live_stream(
            initial,
            receiver,
            move |change| change.document_id == relevant_id,
            move || {
                let collections = Arc::clone(&collections);
                let collection = collection.clone();
                let id = id.clone();
                async move { read_document(&collections, &collection, &id).await }
            },
        ))
    }
}

async fn read_matching(
    collections: &RwLock<HashMap<String, Vec<Document>>>,
    collection: &str,
    filter: &FieldFilter,
) -> Vec<Document> {
    collections
        .read()
        .await
        .get(collection)
        .map(|documents| {
            documents
                .iter()
                .filter(|d| filter.matches(&d.fields))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

async fn read_document(
    collections: &RwLock<HashMap<String, Vec<Document>>>,
    collection: &str,
    id: &str,
) -> Option<Document> {
    collections
        .read()
        .await
        .get(collection)
        .and_then(|documents| documents.iter().find(|d| d.id == id).cloned())
}

/// Yields `initial`, then a fresh read after every relevant change.
/// A lagged receiver re-reads instead of failing since each item is a full
/// snapshot.
fn live_stream<T, F, R, Fut>(
    initial: T,
    receiver: broadcast::Receiver<StoreChange>,
    relevant: F,
    reread: R,
) -> LiveStream<T>
where
    T: Send + 'static,
    F: Fn(&StoreChange) -> bool + Send + Sync + 'static,
    R: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let relevant = Arc::new(relevant);
    let reread = Arc::new(reread);

    stream::unfold(
        (Some(initial), receiver),
        move |(pending, mut receiver)| {
            let relevant = Arc::clone(&relevant);
            let reread = Arc::clone(&reread);
            async move {
                if let Some(value) = pending {
                    return Some((value, (None, receiver)));
                }

                loop {
                    match receiver.recv().await {
                        Ok(change) if !(*relevant)(&change) => continue,
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped = skipped, "Watcher lagged, re-reading");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                    return Some(((*reread)().await, (None, receiver)));
                }
            }
        },
    )
    .boxed()
}
