use futures::stream::AbortHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::room::RoomId;

/// Cancellation token for one live subscription.
///
/// `cancel` is idempotent and dropping the handle cancels, so a subscription
/// cannot outlive its owner.
#[derive(Debug)]
pub struct Unsubscribe {
    kind: &'static str,
    room_id: RoomId,
    cancelled: Arc<AtomicBool>,
    abort: AbortHandle,
    task: JoinHandle<()>,
}

impl Unsubscribe {
    pub(crate) fn new(
        kind: &'static str,
        room_id: RoomId,
        cancelled: Arc<AtomicBool>,
        abort: AbortHandle,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            kind,
            room_id,
            cancelled,
            abort,
            task,
        }
    }

    /// Cancels the subscription. Returns false if it was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            debug!(room_id = %self.room_id, subscription = self.kind, "Already unsubscribed");
            return false;
        }

        self.abort.abort();
        self.task.abort();

        info!(room_id = %self.room_id, subscription = self.kind, "Unsubscribed");
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the driver task has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use crate::room::RoomId;
    use crate::subscription::drive;
    use futures::stream::{self, StreamExt};

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let room_id = RoomId::parse("ABC123").unwrap();
        let handle = drive("test", &room_id, stream::pending::<()>().boxed(), |_| async {});

        assert!(!handle.is_cancelled());
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.is_cancelled());
    }
}
