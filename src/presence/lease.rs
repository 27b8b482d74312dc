use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::tracker::CounterWrite;
use crate::room::RoomId;

/// Identity of one connected client, fresh per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One client's occupancy of a room.
///
/// Not `Clone`: share it behind an `Arc` when several teardown paths may
/// release it. The released flag makes release single-shot.
#[derive(Debug)]
pub struct PresenceLease {
    room_id: RoomId,
    client_id: ClientId,
    acquired_via: CounterWrite,
    acquired_at: DateTime<Utc>,
    released: AtomicBool,
}

impl PresenceLease {
    pub(crate) fn new(room_id: RoomId, client_id: ClientId, acquired_via: CounterWrite) -> Self {
        Self {
            room_id,
            client_id,
            acquired_via,
            acquired_at: Utc::now(),
            released: AtomicBool::new(false),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Which branch of the counter write established this lease
    pub fn acquired_via(&self) -> CounterWrite {
        self.acquired_via
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn is_held(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }

    /// Marks the lease released. Only the first caller gets `true`.
    pub(crate) fn begin_release(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }
}
