//! Chat-list aggregation.
//!
//! Composes conversations with their latest message, unread count, and
//! the counterpart's profile snapshot into a sorted summary list. The
//! three lookups are batch operations keyed by the conversation set, not
//! per-conversation queries. One bad row never blanks the whole list:
//! profile and latest-message failures degrade to placeholder fields.

use duolog_types::error::ChatError;
use duolog_types::message::Message;
use duolog_types::profile::ProfileSnapshot;
use duolog_types::summary::{ChatSummary, PLACEHOLDER_NAME, PLACEHOLDER_PREVIEW};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::repository::{ConversationRepository, MessageRepository, ProfileStore};

/// Builds sorted chat summaries for a user.
pub struct ChatListAggregator<C, M, P>
where
    C: ConversationRepository,
    M: MessageRepository,
    P: ProfileStore,
{
    conversations: C,
    messages: M,
    profiles: P,
    read_timeout: Duration,
}

impl<C, M, P> Clone for ChatListAggregator<C, M, P>
where
    C: ConversationRepository + Clone,
    M: MessageRepository + Clone,
    P: ProfileStore + Clone,
{
    fn clone(&self) -> Self {
        Self {
            conversations: self.conversations.clone(),
            messages: self.messages.clone(),
            profiles: self.profiles.clone(),
            read_timeout: self.read_timeout,
        }
    }
}

impl<C, M, P> ChatListAggregator<C, M, P>
where
    C: ConversationRepository,
    M: MessageRepository,
    P: ProfileStore,
{
    pub fn new(conversations: C, messages: M, profiles: P, read_timeout: Duration) -> Self {
        Self {
            conversations,
            messages,
            profiles,
            read_timeout,
        }
    }

    /// Build the chat list for `for_user`, sorted descending by last
    /// activity. Bounded by the read timeout.
    pub async fn build(&self, for_user: Uuid) -> Result<Vec<ChatSummary>, ChatError> {
        tokio::time::timeout(self.read_timeout, self.build_inner(for_user))
            .await
            .map_err(|_| ChatError::Transient("chat list build timed out".to_string()))?
    }

    async fn build_inner(&self, for_user: Uuid) -> Result<Vec<ChatSummary>, ChatError> {
        let conversations = self
            .conversations
            .list_for_user(for_user)
            .await
            .map_err(ChatError::from_repository)?;

        if conversations.is_empty() {
            return Ok(Vec::new());
        }

        let conversation_ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
        let counterpart_ids: Vec<Uuid> = conversations
            .iter()
            .filter_map(|c| c.counterpart_of(for_user))
            .collect();

        // Each batch degrades independently; a failure falls back to
        // placeholders for the affected field and the list still builds.
        let latest: HashMap<Uuid, Message> =
            match self.messages.latest_by_conversation(&conversation_ids).await {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "latest-message lookup failed, using placeholders");
                    HashMap::new()
                }
            };
        let unread: HashMap<Uuid, u64> =
            match self.messages.unread_counts(&conversation_ids, for_user).await {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "unread-count lookup failed, defaulting to zero");
                    HashMap::new()
                }
            };
        let profiles: HashMap<Uuid, ProfileSnapshot> =
            match self.profiles.get_many(&counterpart_ids).await {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "profile lookup failed, using placeholder names");
                    HashMap::new()
                }
            };

        let mut summaries: Vec<ChatSummary> = Vec::with_capacity(conversations.len());
        for conv in &conversations {
            let Some(counterpart_id) = conv.counterpart_of(for_user) else {
                continue;
            };

            let profile = profiles.get(&counterpart_id);
            let last = latest.get(&conv.id);

            summaries.push(ChatSummary {
                conversation_id: conv.id,
                counterpart_id,
                counterpart_name: profile
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| PLACEHOLDER_NAME.to_string()),
                counterpart_avatar: profile.and_then(|p| p.avatar_url.clone()),
                last_message_preview: last
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| PLACEHOLDER_PREVIEW.to_string()),
                last_activity_at: last.map(|m| m.created_at).unwrap_or(conv.last_activity_at),
                unread_count: unread.get(&conv.id).copied().unwrap_or(0),
            });
        }

        summaries.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(summaries)
    }

    /// Whether `user` participates in the given conversation. Used by the
    /// list session to decide if an insert event warrants a rebuild.
    pub async fn involves(&self, user: Uuid, conversation_id: Uuid) -> Result<bool, ChatError> {
        let conv = self
            .conversations
            .find(conversation_id)
            .await
            .map_err(ChatError::from_repository)?;
        Ok(conv.map(|c| c.involves(user)).unwrap_or(false))
    }
}

/// Case-insensitive substring filter on counterpart name. Pure, no I/O.
pub fn search(summaries: &[ChatSummary], term: &str) -> Vec<ChatSummary> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return summaries.to_vec();
    }
    summaries
        .iter()
        .filter(|s| s.counterpart_name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
