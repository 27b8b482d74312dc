use serde::Serialize;
use strum_macros::{Display, EnumIter};

use crate::feedback::FeedbackSnapshot;
use crate::presence::participant_count;
use crate::room::RoomId;
use crate::stats::AggregateStats;

/// How the client arrived at the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Created the room; sees the participant count and statistics
    #[strum(serialize = "organizer")]
    Organizer,
    #[strum(serialize = "participant")]
    Participant,
}

impl SessionRole {
    pub fn is_organizer(&self) -> bool {
        matches!(self, SessionRole::Organizer)
    }
}

/// Lifecycle of a room session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
pub enum SessionState {
    Idle,
    Attaching,
    Active,
    Detaching,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Attaching)
                | (Idle, Closed)
                | (Attaching, Active)
                | (Attaching, Detaching)
                | (Attaching, Closed)
                | (Active, Detaching)
                | (Detaching, Closed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// What started a session's teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DetachTrigger {
    /// The client navigated away from the room
    #[strum(serialize = "navigation")]
    Navigation,
    /// The UI fired the disconnect signal, or the session was dropped
    #[strum(serialize = "disconnect")]
    Disconnect,
    /// The presence lease could not be acquired
    #[strum(serialize = "presence_failure")]
    PresenceFailure,
}

/// Everything the UI renders for a room, republished on every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub room_id: RoomId,
    /// Raw presence counter, organizer included
    pub present_count: i64,
    pub feedback: FeedbackSnapshot,
    pub stats: AggregateStats,
}

impl RoomView {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            present_count: 0,
            feedback: FeedbackSnapshot::default(),
            stats: AggregateStats::empty(),
        }
    }

    /// Participants shown to the organizer
    pub fn participant_count(&self) -> u64 {
        participant_count(self.present_count)
    }
}
