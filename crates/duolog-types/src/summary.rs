//! Derived chat-list entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when the counterpart's profile cannot be fetched.
pub const PLACEHOLDER_NAME: &str = "Anonymous User";

/// Preview text used for conversations with no messages yet.
pub const PLACEHOLDER_PREVIEW: &str = "No messages yet";

/// One row of the chat list: a conversation joined with its latest
/// message, unread count, and the counterpart's profile snapshot.
///
/// Recomputed on demand by the aggregator; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub conversation_id: Uuid,
    pub counterpart_id: Uuid,
    pub counterpart_name: String,
    pub counterpart_avatar: Option<String>,
    pub last_message_preview: String,
    pub last_activity_at: DateTime<Utc>,
    pub unread_count: u64,
}
