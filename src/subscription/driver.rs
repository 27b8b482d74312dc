use futures::stream::{AbortHandle, Abortable, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::handle::Unsubscribe;
use crate::room::RoomId;
use crate::store::LiveStream;

/// Spawns a task that feeds every item of `stream` to `on_item` until the
/// returned handle is cancelled or dropped
pub fn drive<T, F, Fut>(
    kind: &'static str,
    room_id: &RoomId,
    stream: LiveStream<T>,
    mut on_item: F,
) -> Unsubscribe
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (abort, registration) = AbortHandle::new_pair();
    let mut items = Abortable::new(stream, registration);
    let cancelled = Arc::new(AtomicBool::new(false));

    let task_cancelled = Arc::clone(&cancelled);
    let task_room_id = room_id.clone();

    let task = tokio::spawn(async move {
        info!(
            room_id = %task_room_id,
            subscription = kind,
            "Live subscription task started"
        );

        let mut deliveries: u64 = 0;
        while let Some(item) = items.next().await {
            deliveries += 1;
            debug!(
                room_id = %task_room_id,
                subscription = kind,
                delivery = deliveries,
                "Live update received"
            );
            on_item(item).await;
        }

        if task_cancelled.load(Ordering::SeqCst) {
            debug!(room_id = %task_room_id, subscription = kind, "Live subscription stopped");
        } else {
            warn!(
                room_id = %task_room_id,
                subscription = kind,
                "Live subscription ended - store closed the stream"
            );
        }
    });

    Unsubscribe::new(kind, room_id.clone(), cancelled, abort, task)
}
