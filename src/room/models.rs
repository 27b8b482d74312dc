use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Collection holding one document per room, keyed by room code
pub const ROOMS_COLLECTION: &str = "rooms";
/// Shared presence counter on the room document
pub const ACTIVE_USERS_FIELD: &str = "activeUsers";

const MAX_ROOM_ID_LEN: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedRoomId {
    #[error("Room code is empty")]
    Empty,

    #[error("Room code contains invalid character {0:?}")]
    InvalidCharacter(char),

    #[error("Room code is {0} characters long")]
    TooLong(usize),
}

/// Opaque, human-typeable room code.
///
/// Only surrounding whitespace is stripped; case is preserved, so `abc123`
/// and `ABC123` name different rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(raw: &str) -> Result<Self, MalformedRoomId> {
        let code = raw.trim();

        if code.is_empty() {
            return Err(MalformedRoomId::Empty);
        }
        let len = code.chars().count();
        if len > MAX_ROOM_ID_LEN {
            return Err(MalformedRoomId::TooLong(len));
        }
        // The code doubles as a document id
        if let Some(c) = code
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || *c == '/')
        {
            return Err(MalformedRoomId::InvalidCharacter(c));
        }

        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomId {
    type Err = MalformedRoomId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Wire shape of a room document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    #[serde(alias = "roomCode")]
    pub code: String,
    #[serde(default)]
    pub active_users: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RoomDocument {
    pub fn new(room_id: &RoomId) -> Self {
        Self {
            code: room_id.to_string(),
            active_users: 0,
            created_at: Some(Utc::now()),
        }
    }
}
