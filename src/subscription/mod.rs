// Live subscription plumbing
//
// Store streams are wrapped in `Abortable` and pulled by a spawned driver
// task. The returned `Unsubscribe` is the cancellation token for both.

pub use driver::drive;
pub use handle::Unsubscribe;

mod driver;
mod handle;

use thiserror::Error;

use crate::room::RoomId;
use crate::store::StoreError;

/// A live query could not be established
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind} subscription for room {room_id} failed: {source}")]
pub struct SubscriptionError {
    pub kind: &'static str,
    pub room_id: RoomId,
    #[source]
    pub source: StoreError,
}

impl SubscriptionError {
    pub fn new(kind: &'static str, room_id: &RoomId, source: StoreError) -> Self {
        Self {
            kind,
            room_id: room_id.clone(),
            source,
        }
    }
}
