//! ConversationRepository trait definition.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use duolog_types::conversation::{CanonicalPair, Conversation};
use duolog_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for conversation persistence.
///
/// Implementations live in duolog-infra (e.g. `SqliteConversationRepository`).
pub trait ConversationRepository: Send + Sync {
    /// Insert-if-absent against the unique canonical pair key, returning
    /// the surviving row's id.
    ///
    /// MUST be a single atomic operation: two callers racing to start the
    /// same conversation converge on exactly one row. A non-atomic
    /// select-then-insert does not satisfy this contract.
    fn upsert_pair(
        &self,
        pair: CanonicalPair,
    ) -> impl std::future::Future<Output = Result<Uuid, RepositoryError>> + Send;

    /// Fetch a conversation by id.
    fn find(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// All conversations the user participates in, ordered by
    /// `last_activity_at` descending.
    fn list_for_user(
        &self,
        user: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;
}
