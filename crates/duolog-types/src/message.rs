//! Message type and ordering.
//!
//! Messages are append-only. `read_at` is the only mutable field: set at
//! most once by the participant who did not send the message, and never
//! cleared. Within a conversation messages are totally ordered by
//! `(created_at, id)` -- ids are UUIDv7, so the tiebreak is deterministic
//! and itself time-ordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single direct message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// When the counterpart first displayed this message. Monotonic:
    /// set once, never unset.
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// The conversation-order sort key.
    pub fn order_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }

    /// Whether this message counts as unread from `user`'s perspective.
    pub fn unread_for(&self, user: Uuid) -> bool {
        self.sender_id != user && self.read_at.is_none()
    }
}
