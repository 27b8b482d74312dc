use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Abrupt-disconnect trigger handed to the UI layer ("about to unload").
///
/// Cloneable; firing more than once is harmless.
#[derive(Debug, Clone, Default)]
pub struct DisconnectSignal {
    notify: Arc<Notify>,
    fired: Arc<AtomicBool>,
}

impl DisconnectSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            // Stores a permit if the watcher is not waiting yet
            self.notify.notify_one();
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has fired
    pub(crate) async fn fired(&self) {
        if self.has_fired() {
            return;
        }
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_fire_before_wait_is_not_lost() {
        let signal = DisconnectSignal::new();
        signal.fire();

        let waited = timeout(Duration::from_millis(100), signal.fired()).await;

        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn test_clone_fires_shared_signal() {
        let signal = DisconnectSignal::new();
        let ui_handle = signal.clone();

        let waiter = tokio::spawn(async move { signal.fired().await });
        ui_handle.fire();
        ui_handle.fire();

        assert!(timeout(Duration::from_millis(100), waiter).await.is_ok());
        assert!(ui_handle.has_fired());
    }
}
