//! Conversation identity resolution.
//!
//! Maps an unordered pair of participants to the single canonical
//! conversation between them, creating one only if none exists. The
//! repository's `upsert_pair` is atomic, so concurrent first-time
//! resolves for the same pair converge on exactly one row -- there is no
//! client-side locking and no check-then-insert window.

use duolog_types::conversation::CanonicalPair;
use duolog_types::error::{ChatError, RepositoryError};
use tracing::debug;
use uuid::Uuid;

use crate::repository::ConversationRepository;

/// Resolves participant pairs to conversation ids.
pub struct ConversationResolver<C: ConversationRepository> {
    conversations: C,
}

impl<C: ConversationRepository> ConversationResolver<C> {
    pub fn new(conversations: C) -> Self {
        Self { conversations }
    }

    /// Resolve the conversation between `a` and `b`, creating it if it
    /// does not exist yet.
    ///
    /// Symmetric: `resolve(a, b)` and `resolve(b, a)` yield the same id.
    pub async fn resolve(&self, a: Uuid, b: Uuid) -> Result<Uuid, ChatError> {
        let pair = CanonicalPair::new(a, b).ok_or(ChatError::SelfConversation)?;

        let id = self.conversations.upsert_pair(pair).await.map_err(|e| match e {
            RepositoryError::Connection | RepositoryError::Timeout => {
                ChatError::Transient(e.to_string())
            }
            other => ChatError::Resolution(other.to_string()),
        })?;

        debug!(conversation_id = %id, low = %pair.low(), high = %pair.high(), "resolved conversation");
        Ok(id)
    }
}
