use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::models::StoreChange;

/// Fans document writes out to live watchers, one channel per collection
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    /// Collection-specific change channels: collection -> sender
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<StoreChange>>>>,
    capacity: usize,
}

impl ChangeNotifier {
    /// Creates a notifier whose channels buffer `capacity` changes per receiver
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publishes a change to every watcher of the collection
    pub async fn publish(&self, collection: &str, change: StoreChange) {
        let channels = self.channels.read().await;

        match channels.get(collection) {
            Some(sender) => match sender.send(change) {
                Ok(receiver_count) => {
                    debug!(
                        collection = %collection,
                        receivers = receiver_count,
                        "Store change published"
                    );
                }
                Err(_) => {
                    debug!(collection = %collection, "Store change published with no watchers");
                }
            },
            None => {
                // Nobody has ever watched this collection; a later watcher
                // reads current state on subscribe, so the change is not lost.
                debug!(collection = %collection, "No change channel for collection");
            }
        }
    }

    /// Subscribes to changes in a collection, creating its channel on first use
    pub async fn subscribe(&self, collection: &str) -> broadcast::Receiver<StoreChange> {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(collection) {
            sender.subscribe()
        } else {
            debug!(collection = %collection, "Creating change channel for subscription");
            drop(channels);

            let mut channels = self.channels.write().await;
            // Another watcher may have created it between the two locks
            let sender = channels
                .entry(collection.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0);
            sender.subscribe()
        }
    }

    /// Number of live receivers on a collection's channel
    pub async fn watcher_count(&self, collection: &str) -> usize {
        self.channels
            .read()
            .await
            .get(collection)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
