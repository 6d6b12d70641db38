//! ProfileStore trait definition.

use duolog_types::error::RepositoryError;
use duolog_types::profile::ProfileSnapshot;
use std::collections::HashMap;
use uuid::Uuid;

/// Read-only view of the profile collaborator.
///
/// The sync engine never writes profiles; a missing profile is `None`,
/// not an error, and the chat list degrades it to a placeholder name.
pub trait ProfileStore: Send + Sync {
    fn get(
        &self,
        user_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ProfileSnapshot>, RepositoryError>> + Send;

    /// Bulk fetch; absent users are simply missing from the map.
    fn get_many(
        &self,
        user_ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<HashMap<Uuid, ProfileSnapshot>, RepositoryError>> + Send;
}
