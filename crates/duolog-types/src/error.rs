use thiserror::Error;
use uuid::Uuid;

/// Errors from repository operations (used by trait definitions in
/// duolog-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("operation timed out")]
    Timeout,
}

impl RepositoryError {
    /// Whether retrying the same operation can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Connection | RepositoryError::Timeout)
    }
}

/// Errors surfaced by the synchronization engine's services.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Message content was empty after trimming.
    #[error("message content is empty")]
    EmptyMessage,

    /// Both sides of a conversation were the same user.
    #[error("cannot start a conversation with yourself")]
    SelfConversation,

    /// The conversation upsert failed for a reason other than the
    /// expected duplicate-pair conflict.
    #[error("conversation resolution failed: {0}")]
    Resolution(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("message {0} not found")]
    MessageNotFound(Uuid),

    /// Storage was unreachable or timed out; safe to retry reads, and
    /// writes where the caller can tell nothing was applied.
    #[error("transient store error: {0}")]
    Transient(String),

    /// The profile collaborator could not serve a lookup. Non-fatal: the
    /// aggregator degrades to placeholder display fields.
    #[error("profile unavailable for user {0}")]
    ProfileUnavailable(Uuid),
}

impl ChatError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::Transient(_))
    }

    /// Map a repository failure into the engine error space.
    pub fn from_repository(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Connection => ChatError::Transient("database connection error".to_string()),
            RepositoryError::Timeout => ChatError::Transient("operation timed out".to_string()),
            other => ChatError::Resolution(other.to_string()),
        }
    }
}
