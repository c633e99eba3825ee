// Notification entity
// The unit of change information pushed to every subscriber of a note

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ConnectionId, NoteId, NotificationKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub note_id: NoteId,
    pub actor: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_connection: Option<ConnectionId>,
}

impl Notification {
    pub fn new(kind: NotificationKind, note_id: NoteId, actor: impl Into<String>) -> Self {
        Self {
            kind,
            note_id,
            actor: actor.into(),
            created: Utc::now(),
            payload: serde_json::Value::Null,
            origin_connection: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_origin(mut self, origin: ConnectionId) -> Self {
        self.origin_connection = Some(origin);
        self
    }
}

/// Body accepted by the edit usecase before it becomes a [`Notification`].
#[derive(Debug, Clone, Deserialize)]
pub struct NoteEventRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub origin_connection: Option<ConnectionId>,
}
