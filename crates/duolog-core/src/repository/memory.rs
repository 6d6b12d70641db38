//! In-memory repository fakes for service-level tests.
//!
//! One `MemoryStore` implements all three repository traits behind a
//! mutex, with failure-injection switches for exercising degradation
//! paths (profile outage, transient write failures).

use chrono::{DateTime, Utc};
use duolog_types::conversation::{CanonicalPair, Conversation};
use duolog_types::error::RepositoryError;
use duolog_types::message::Message;
use duolog_types::profile::ProfileSnapshot;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{ConversationRepository, MessageRepository, ProfileStore};

#[derive(Default)]
struct Inner {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    profiles: HashMap<Uuid, ProfileSnapshot>,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    fail_profiles: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    // Number of upcoming mark_read calls that fail with a transient error.
    mark_read_failures: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_profile(&self, profile: ProfileSnapshot) {
        self.inner.lock().unwrap().profiles.insert(profile.user_id, profile);
    }

    pub fn set_fail_profiles(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_mark_read(&self, times: u32) {
        self.mark_read_failures.store(times, Ordering::SeqCst);
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }

    pub fn conversation_count(&self) -> usize {
        self.inner.lock().unwrap().conversations.len()
    }

    pub fn get_message(&self, id: Uuid) -> Option<Message> {
        self.inner.lock().unwrap().messages.iter().find(|m| m.id == id).cloned()
    }

    fn check_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection)
        } else {
            Ok(())
        }
    }
}

impl ConversationRepository for MemoryStore {
    async fn upsert_pair(&self, pair: CanonicalPair) -> Result<Uuid, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .conversations
            .iter()
            .find(|c| c.participant_low == pair.low() && c.participant_high == pair.high())
        {
            return Ok(existing.id);
        }
        let now = Utc::now();
        let conv = Conversation {
            id: Uuid::now_v7(),
            participant_low: pair.low(),
            participant_high: pair.high(),
            created_at: now,
            last_activity_at: now,
        };
        let id = conv.id;
        inner.conversations.push(conv);
        Ok(id)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Conversation>, RepositoryError> {
        self.check_reads()?;
        Ok(self.inner.lock().unwrap().conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Conversation>, RepositoryError> {
        self.check_reads()?;
        let mut convs: Vec<Conversation> = self
            .inner
            .lock()
            .unwrap()
            .conversations
            .iter()
            .filter(|c| c.involves(user))
            .cloned()
            .collect();
        convs.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(convs)
    }
}

impl MessageRepository for MemoryStore {
    async fn insert(&self, message: &Message) -> Result<CanonicalPair, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let pair = {
            let conv = inner
                .conversations
                .iter_mut()
                .find(|c| c.id == message.conversation_id)
                .ok_or(RepositoryError::NotFound)?;
            conv.last_activity_at = message.created_at;
            conv.participants().ok_or(RepositoryError::Query("corrupt pair".to_string()))?
        };
        inner.messages.push(message.clone());
        Ok(pair)
    }

    async fn list(&self, conversation_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        self.check_reads()?;
        let mut messages: Vec<Message> = self
            .inner
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.order_key());
        Ok(messages)
    }

    async fn latest_by_conversation(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Message>, RepositoryError> {
        self.check_reads()?;
        let inner = self.inner.lock().unwrap();
        let mut latest: HashMap<Uuid, Message> = HashMap::new();
        for msg in &inner.messages {
            if !conversation_ids.contains(&msg.conversation_id) {
                continue;
            }
            match latest.get(&msg.conversation_id) {
                Some(current) if current.order_key() >= msg.order_key() => {}
                _ => {
                    latest.insert(msg.conversation_id, msg.clone());
                }
            }
        }
        Ok(latest)
    }

    async fn unread_counts(
        &self,
        conversation_ids: &[Uuid],
        for_user: Uuid,
    ) -> Result<HashMap<Uuid, u64>, RepositoryError> {
        self.check_reads()?;
        let inner = self.inner.lock().unwrap();
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for msg in &inner.messages {
            if conversation_ids.contains(&msg.conversation_id) && msg.unread_for(for_user) {
                *counts.entry(msg.conversation_id).or_default() += 1;
            }
        }
        Ok(counts)
    }

    async fn unread_count(
        &self,
        conversation_id: Uuid,
        for_user: Uuid,
    ) -> Result<u64, RepositoryError> {
        self.check_reads()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.unread_for(for_user))
            .count() as u64)
    }

    async fn mark_read_if_unread(
        &self,
        reader: Uuid,
        message_ids: &[Uuid],
        read_at_time: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        if self
            .mark_read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RepositoryError::Connection);
        }
        let mut inner = self.inner.lock().unwrap();
        let mut marked = 0;
        for msg in inner.messages.iter_mut() {
            if message_ids.contains(&msg.id) && msg.read_at.is_none() && msg.sender_id != reader {
                msg.read_at = Some(read_at_time);
                marked += 1;
            }
        }
        Ok(marked)
    }
}

impl ProfileStore for MemoryStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<ProfileSnapshot>, RepositoryError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(self.inner.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn get_many(
        &self,
        user_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProfileSnapshot>, RepositoryError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        let inner = self.inner.lock().unwrap();
        Ok(user_ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}
