//! MessageRepository trait definition.
//!
//! The chat-list lookups are deliberately batch operations keyed by the
//! conversation set, so building a list of N conversations costs three
//! queries rather than 3N.

use chrono::{DateTime, Utc};
use duolog_types::conversation::CanonicalPair;
use duolog_types::error::RepositoryError;
use duolog_types::message::Message;
use std::collections::HashMap;
use uuid::Uuid;

/// Repository trait for append-only message persistence and read state.
pub trait MessageRepository: Send + Sync {
    /// Insert a message and advance the owning conversation's
    /// `last_activity_at` to the message's `created_at`, in one
    /// transaction -- partial application is not acceptable.
    ///
    /// Returns the owning conversation's participant pair (used to route
    /// the insert event to per-user topics). A missing conversation is
    /// `RepositoryError::NotFound`.
    fn insert(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<CanonicalPair, RepositoryError>> + Send;

    /// Full history of a conversation in ascending `(created_at, id)`
    /// order. Empty vec, not an error, when none exist.
    fn list(
        &self,
        conversation_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// The most recent message of each listed conversation.
    fn latest_by_conversation(
        &self,
        conversation_ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<HashMap<Uuid, Message>, RepositoryError>> + Send;

    /// Unread counts for `for_user` keyed by conversation; conversations
    /// with no unread messages are absent from the map.
    fn unread_counts(
        &self,
        conversation_ids: &[Uuid],
        for_user: Uuid,
    ) -> impl std::future::Future<Output = Result<HashMap<Uuid, u64>, RepositoryError>> + Send;

    /// Unread count for one conversation.
    fn unread_count(
        &self,
        conversation_id: Uuid,
        for_user: Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Set `read_at = read_at_time` on each listed message that is still
    /// unread and was not sent by `reader` ("set if null" semantics).
    /// Already-read ids and the reader's own messages are no-ops.
    ///
    /// Returns the number of messages newly marked. Idempotent.
    fn mark_read_if_unread(
        &self,
        reader: Uuid,
        message_ids: &[Uuid],
        read_at_time: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
