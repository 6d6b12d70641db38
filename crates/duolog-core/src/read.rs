//! Read-state tracking.
//!
//! `read_at` is monotonic: set at most once, never cleared, and only on
//! messages the reader did not send. The conditional update makes
//! mark-read idempotent, which in turn makes it safe to retry once on a
//! transient failure. Unread counts read through to storage, so a client
//! that just marked messages read observes the new count immediately.

use chrono::Utc;
use duolog_types::error::ChatError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repository::MessageRepository;

/// Marks messages read and computes unread counts.
pub struct ReadTracker<M: MessageRepository> {
    messages: M,
}

impl<M: MessageRepository + Clone> Clone for ReadTracker<M> {
    fn clone(&self) -> Self {
        Self {
            messages: self.messages.clone(),
        }
    }
}

impl<M: MessageRepository> ReadTracker<M> {
    pub fn new(messages: M) -> Self {
        Self { messages }
    }

    /// Set the read receipt on each listed message that is still unread
    /// and was not sent by `reader`. Ids already read, unknown, or owned
    /// by the reader are no-ops, not errors.
    ///
    /// Returns the number of messages newly marked. Retried once on a
    /// transient failure.
    pub async fn mark_read(&self, reader: Uuid, message_ids: &[Uuid]) -> Result<u64, ChatError> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();

        let first = self.messages.mark_read_if_unread(reader, message_ids, now).await;
        let marked = match first {
            Ok(n) => n,
            Err(e) if e.is_transient() => {
                warn!(reader = %reader, error = %e, "mark_read failed, retrying once");
                self.messages
                    .mark_read_if_unread(reader, message_ids, now)
                    .await
                    .map_err(ChatError::from_repository)?
            }
            Err(e) => return Err(ChatError::from_repository(e)),
        };

        if marked > 0 {
            debug!(reader = %reader, marked, "messages marked read");
        }
        Ok(marked)
    }

    /// Number of messages in the conversation sent by the counterpart
    /// and not yet read. Reflects any `mark_read` issued before it.
    pub async fn unread_count(&self, conversation_id: Uuid, for_user: Uuid) -> Result<u64, ChatError> {
        self.messages
            .unread_count(conversation_id, for_user)
            .await
            .map_err(ChatError::from_repository)
    }
}
