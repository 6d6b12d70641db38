//! Topic hub for insert events.
//!
//! Two topic families, both backed by `tokio::sync::broadcast`:
//! per-conversation topics feeding open chat views, and per-user topics
//! feeding chat-list refreshes. Publishing routes one event to the
//! conversation topic and to both participants' user topics. Delivery is
//! at-least-once; consumers dedupe by message id.

use dashmap::DashMap;
use duolog_types::event::ChatEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Multi-producer, multi-consumer feed of `ChatEvent`s, scoped by topic.
///
/// Cloning the feed shares the underlying topic registries. Topics are
/// created lazily on subscribe and pruned once their last receiver is
/// gone, so a torn-down view releases its channel.
#[derive(Clone)]
pub struct MessageFeed {
    capacity: usize,
    conversation_topics: Arc<DashMap<Uuid, broadcast::Sender<ChatEvent>>>,
    user_topics: Arc<DashMap<Uuid, broadcast::Sender<ChatEvent>>>,
}

impl MessageFeed {
    /// Create a feed whose topics buffer up to `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            conversation_topics: Arc::new(DashMap::new()),
            user_topics: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe to inserts for a single conversation.
    pub fn subscribe_conversation(&self, conversation_id: Uuid) -> broadcast::Receiver<ChatEvent> {
        Self::subscribe(&self.conversation_topics, conversation_id, self.capacity)
    }

    /// Subscribe to inserts across every conversation the user
    /// participates in.
    pub fn subscribe_user(&self, user_id: Uuid) -> broadcast::Receiver<ChatEvent> {
        Self::subscribe(&self.user_topics, user_id, self.capacity)
    }

    /// Publish an event to its conversation topic and both participants'
    /// user topics. Topics with no subscribers drop the event.
    pub fn publish(&self, event: ChatEvent) {
        let pair = event.participants();
        Self::send(&self.conversation_topics, event.conversation_id(), &event);
        Self::send(&self.user_topics, pair.low(), &event);
        Self::send(&self.user_topics, pair.high(), &event);
    }

    fn subscribe(
        topics: &DashMap<Uuid, broadcast::Sender<ChatEvent>>,
        key: Uuid,
        capacity: usize,
    ) -> broadcast::Receiver<ChatEvent> {
        let entry = topics.entry(key).or_insert_with(|| {
            let (tx, _) = broadcast::channel(capacity);
            tx
        });
        entry.subscribe()
    }

    fn send(topics: &DashMap<Uuid, broadcast::Sender<ChatEvent>>, key: Uuid, event: &ChatEvent) {
        let stale = match topics.get(&key) {
            Some(sender) => sender.send(event.clone()).is_err(),
            None => false,
        };
        // A send error means the last receiver is gone; release the topic.
        if stale {
            topics.remove_if(&key, |_, sender| sender.receiver_count() == 0);
            debug!(topic = %key, "pruned idle feed topic");
        }
    }

    /// Number of currently open conversation topics.
    pub fn conversation_topic_count(&self) -> usize {
        self.conversation_topics.len()
    }
}

impl std::fmt::Debug for MessageFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFeed")
            .field("conversation_topics", &self.conversation_topics.len())
            .field("user_topics", &self.user_topics.len())
            .finish()
    }
}
