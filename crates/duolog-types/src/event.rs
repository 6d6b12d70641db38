//! Event types for the Duolog live-update feed.
//!
//! `ChatEvent` is the event type broadcast when storage changes. All
//! variants are Clone + Send + Sync for use with tokio broadcast channels.
//! Delivery is at-least-once; consumers dedupe by message id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::CanonicalPair;
use crate::message::Message;

/// Events emitted by the message store after a successful write.
///
/// The participant pair rides along so the feed can route the event to
/// both users' topics without a storage lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message was appended to a conversation.
    MessageInserted {
        message: Message,
        participants: CanonicalPair,
    },
}

impl ChatEvent {
    /// The conversation this event is scoped to.
    pub fn conversation_id(&self) -> Uuid {
        match self {
            ChatEvent::MessageInserted { message, .. } => message.conversation_id,
        }
    }

    /// The participants whose per-user topics should receive this event.
    pub fn participants(&self) -> CanonicalPair {
        match self {
            ChatEvent::MessageInserted { participants, .. } => *participants,
        }
    }
}
