//! Client-side view state for one open conversation.
//!
//! Pure and synchronously testable: no I/O, no tasks. The session layer
//! feeds it hydrated history, optimistic local appends, and remote feed
//! events; the view keeps the message list in `(created_at, id)` order
//! and dedupes strictly by message id, never by content. The feed is
//! at-least-once and subscription starts before hydration, so duplicate
//! arrivals are the normal case, not an anomaly.

use duolog_types::message::Message;
use std::collections::HashSet;
use uuid::Uuid;

/// What applying a remote event did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Already present (optimistic echo or redelivery). Nothing changed.
    Duplicate,
    /// Inserted into the view. `mark_read` is true when the message came
    /// from the counterpart and now owes a read receipt.
    Merged { mark_read: bool },
}

/// Ordered, deduplicated message state for one conversation as seen by
/// one participant.
#[derive(Debug)]
pub struct ChatView {
    viewer: Uuid,
    conversation_id: Uuid,
    messages: Vec<Message>,
    seen: HashSet<Uuid>,
    live_unavailable: bool,
}

impl ChatView {
    pub fn new(viewer: Uuid, conversation_id: Uuid) -> Self {
        Self {
            viewer,
            conversation_id,
            messages: Vec::new(),
            seen: HashSet::new(),
            live_unavailable: false,
        }
    }

    pub fn viewer(&self) -> Uuid {
        self.viewer
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// Messages in ascending `(created_at, id)` order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replace the view's contents with freshly fetched history. Used at
    /// open and on lag resync. Keeps any messages already merged that the
    /// fetch has not caught up to yet.
    pub fn hydrate(&mut self, history: Vec<Message>) {
        let retained: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| !history.iter().any(|h| h.id == m.id))
            .cloned()
            .collect();

        self.messages = history;
        self.messages.retain(|m| m.conversation_id == self.conversation_id);
        self.seen = self.messages.iter().map(|m| m.id).collect();

        for msg in retained {
            self.insert_ordered(msg);
        }
    }

    /// Record an optimistic local append so the echoed feed event is
    /// recognized as a duplicate.
    pub fn apply_local(&mut self, message: Message) {
        if self.seen.insert(message.id) {
            self.insert_ordered(message);
        }
    }

    /// Merge a message delivered over the feed.
    pub fn apply_remote(&mut self, message: Message) -> RemoteOutcome {
        if message.conversation_id != self.conversation_id || !self.seen.insert(message.id) {
            return RemoteOutcome::Duplicate;
        }
        let mark_read = message.unread_for(self.viewer);
        self.insert_ordered(message);
        RemoteOutcome::Merged { mark_read }
    }

    /// Ids of counterpart messages still awaiting a read receipt.
    pub fn unread_ids(&self) -> Vec<Uuid> {
        self.messages
            .iter()
            .filter(|m| m.unread_for(self.viewer))
            .map(|m| m.id)
            .collect()
    }

    /// Whether live delivery has been declared unavailable. History stays
    /// loaded either way.
    pub fn is_live_unavailable(&self) -> bool {
        self.live_unavailable
    }

    pub fn set_live_unavailable(&mut self) {
        self.live_unavailable = true;
    }

    fn insert_ordered(&mut self, message: Message) {
        let key = message.order_key();
        let at = self
            .messages
            .partition_point(|m| m.order_key() <= key);
        self.messages.insert(at, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn message(conversation_id: Uuid, sender_id: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    fn contents(view: &ChatView) -> Vec<&str> {
        view.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn echoed_local_append_is_a_duplicate() {
        let conv = Uuid::now_v7();
        let me = Uuid::now_v7();
        let mut view = ChatView::new(me, conv);

        let msg = message(conv, me, "hello");
        view.apply_local(msg.clone());
        assert_eq!(view.apply_remote(msg), RemoteOutcome::Duplicate);
        assert_eq!(contents(&view), ["hello"]);
    }

    #[test]
    fn counterpart_message_merges_and_owes_receipt() {
        let conv = Uuid::now_v7();
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut view = ChatView::new(me, conv);

        let outcome = view.apply_remote(message(conv, other, "hey"));
        assert_eq!(outcome, RemoteOutcome::Merged { mark_read: true });
        assert_eq!(contents(&view), ["hey"]);
    }

    #[test]
    fn own_message_over_feed_merges_without_receipt() {
        let conv = Uuid::now_v7();
        let me = Uuid::now_v7();
        let mut view = ChatView::new(me, conv);

        // Same user on another device: not yet seen locally, but no
        // receipt owed for one's own message.
        let outcome = view.apply_remote(message(conv, me, "from elsewhere"));
        assert_eq!(outcome, RemoteOutcome::Merged { mark_read: false });
    }

    #[test]
    fn redelivered_remote_is_dropped() {
        let conv = Uuid::now_v7();
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut view = ChatView::new(me, conv);

        let msg = message(conv, other, "once");
        assert!(matches!(view.apply_remote(msg.clone()), RemoteOutcome::Merged { .. }));
        assert_eq!(view.apply_remote(msg), RemoteOutcome::Duplicate);
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn foreign_conversation_event_is_ignored() {
        let conv = Uuid::now_v7();
        let me = Uuid::now_v7();
        let mut view = ChatView::new(me, conv);

        let outcome = view.apply_remote(message(Uuid::now_v7(), me, "stray"));
        assert_eq!(outcome, RemoteOutcome::Duplicate);
        assert!(view.messages().is_empty());
    }

    #[test]
    fn merge_preserves_timestamp_order() {
        let conv = Uuid::now_v7();
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut view = ChatView::new(me, conv);

        let mut early = message(conv, other, "early");
        early.created_at = Utc::now() - Duration::seconds(10);
        let late = message(conv, me, "late");

        view.apply_local(late);
        view.apply_remote(early);
        assert_eq!(contents(&view), ["early", "late"]);
    }

    #[test]
    fn hydrate_keeps_messages_the_fetch_missed() {
        let conv = Uuid::now_v7();
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut view = ChatView::new(me, conv);

        let m1 = message(conv, other, "one");
        let m2 = message(conv, other, "two");
        let racer = message(conv, other, "raced past the fetch");

        // Event arrives between the subscribe and the history read.
        view.apply_remote(racer.clone());
        view.hydrate(vec![m1, m2]);

        assert_eq!(contents(&view), ["one", "two", "raced past the fetch"]);
        // Still deduped after rehydration.
        assert_eq!(view.apply_remote(racer), RemoteOutcome::Duplicate);
    }

    #[test]
    fn unread_ids_lists_only_counterpart_unread() {
        let conv = Uuid::now_v7();
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut view = ChatView::new(me, conv);

        let mine = message(conv, me, "mine");
        let theirs = message(conv, other, "theirs");
        let mut already_read = message(conv, other, "old news");
        already_read.read_at = Some(Utc::now());

        view.hydrate(vec![mine, theirs.clone(), already_read]);
        assert_eq!(view.unread_ids(), vec![theirs.id]);
    }

    #[test]
    fn live_unavailable_flag_does_not_drop_history() {
        let conv = Uuid::now_v7();
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut view = ChatView::new(me, conv);

        view.hydrate(vec![message(conv, other, "kept")]);
        view.set_live_unavailable();

        assert!(view.is_live_unavailable());
        assert_eq!(contents(&view), ["kept"]);
    }
}
