//! Ordered, append-only message persistence.
//!
//! `MessageStore` validates and persists outgoing messages and hydrates
//! conversation history. The repository advances the owning
//! conversation's `last_activity_at` in the same transaction as the
//! insert; on success the store publishes the insert event to the live
//! feed. Appends are never blindly retried -- a failed append cannot be
//! distinguished from an unacknowledged success, so the error is
//! surfaced and the caller keeps the composed text for a manual retry.

use chrono::Utc;
use duolog_types::error::{ChatError, RepositoryError};
use duolog_types::event::ChatEvent;
use duolog_types::message::Message;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::live::MessageFeed;
use crate::repository::MessageRepository;

/// Append and list messages for conversations.
pub struct MessageStore<M: MessageRepository> {
    messages: M,
    feed: MessageFeed,
    read_timeout: Duration,
}

impl<M: MessageRepository + Clone> Clone for MessageStore<M> {
    fn clone(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            feed: self.feed.clone(),
            read_timeout: self.read_timeout,
        }
    }
}

impl<M: MessageRepository> MessageStore<M> {
    pub fn new(messages: M, feed: MessageFeed, read_timeout: Duration) -> Self {
        Self {
            messages,
            feed,
            read_timeout,
        }
    }

    /// The feed this store publishes to.
    pub fn feed(&self) -> &MessageFeed {
        &self.feed
    }

    /// Append a message to a conversation.
    ///
    /// Content is trimmed; empty-after-trim fails validation before any
    /// I/O. The message id is UUIDv7 and the timestamp is assigned here,
    /// so `(created_at, id)` ordering is stable under ties.
    pub async fn append(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message = Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
            read_at: None,
        };

        let participants = self.messages.insert(&message).await.map_err(|e| match e {
            RepositoryError::NotFound => ChatError::ConversationNotFound(conversation_id),
            RepositoryError::Connection | RepositoryError::Timeout => {
                ChatError::Transient(e.to_string())
            }
            other => ChatError::Resolution(other.to_string()),
        })?;

        debug!(message_id = %message.id, conversation_id = %conversation_id, "message appended");

        self.feed.publish(ChatEvent::MessageInserted {
            message: message.clone(),
            participants,
        });

        Ok(message)
    }

    /// Full conversation history in ascending `(created_at, id)` order.
    ///
    /// Empty history is an empty vec, not an error. Bounded by the read
    /// timeout; expiry surfaces a retryable transient error.
    pub async fn list(&self, conversation_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let result = tokio::time::timeout(self.read_timeout, self.messages.list(conversation_id))
            .await
            .map_err(|_| ChatError::Transient("history read timed out".to_string()))?;

        result.map_err(ChatError::from_repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ConversationRepository;
    use crate::repository::memory::MemoryStore;
    use duolog_types::conversation::CanonicalPair;

    fn store(repo: MemoryStore) -> MessageStore<MemoryStore> {
        MessageStore::new(repo, MessageFeed::new(16), Duration::from_secs(5))
    }

    async fn seed_conversation(repo: &MemoryStore, a: Uuid, b: Uuid) -> Uuid {
        repo.upsert_pair(CanonicalPair::new(a, b).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn append_rejects_empty_content() {
        let repo = MemoryStore::new();
        let store = store(repo.clone());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let conv = seed_conversation(&repo, a, b).await;

        let err = store.append(conv, a, "   \n\t ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert_eq!(repo.message_count(), 0);
    }

    #[tokio::test]
    async fn append_trims_content() {
        let repo = MemoryStore::new();
        let store = store(repo.clone());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let conv = seed_conversation(&repo, a, b).await;

        let msg = store.append(conv, a, "  hello  ").await.unwrap();
        assert_eq!(msg.content, "hello");
    }

    #[tokio::test]
    async fn append_to_missing_conversation_is_not_found() {
        let store = store(MemoryStore::new());
        let missing = Uuid::now_v7();
        let err = store.append(missing, Uuid::now_v7(), "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn append_publishes_insert_event() {
        let repo = MemoryStore::new();
        let store = store(repo.clone());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let conv = seed_conversation(&repo, a, b).await;

        let mut rx = store.feed().subscribe_conversation(conv);
        let msg = store.append(conv, a, "hello").await.unwrap();

        let event = rx.recv().await.unwrap();
        let ChatEvent::MessageInserted { message, participants } = event;
        assert_eq!(message.id, msg.id);
        assert!(participants.contains(a));
        assert!(participants.contains(b));
    }

    #[tokio::test]
    async fn list_returns_appends_in_order() {
        let repo = MemoryStore::new();
        let store = store(repo.clone());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let conv = seed_conversation(&repo, a, b).await;

        store.append(conv, a, "hello").await.unwrap();
        store.append(conv, b, "hi").await.unwrap();

        let messages = store.list(conv).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hello", "hi"]);

        // Repeated reads are stable.
        let again = store.list(conv).await.unwrap();
        assert_eq!(
            again.iter().map(|m| m.id).collect::<Vec<_>>(),
            messages.iter().map(|m| m.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn list_of_empty_conversation_is_empty() {
        let repo = MemoryStore::new();
        let store = store(repo.clone());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let conv = seed_conversation(&repo, a, b).await;

        assert!(store.list(conv).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_surfaces_transient_error_as_retryable() {
        let repo = MemoryStore::new();
        let store = store(repo.clone());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let conv = seed_conversation(&repo, a, b).await;

        repo.set_fail_reads(true);
        let err = store.list(conv).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
