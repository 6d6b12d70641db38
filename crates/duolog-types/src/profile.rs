//! Profile snapshot consumed by the chat list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display data for a chat counterpart.
///
/// Owned by the profile collaborator; the sync engine reads it and never
/// writes through this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}
