//! Subscription sessions.
//!
//! `LiveSession` ties one open `ChatView` to the feed: it subscribes
//! before hydrating (the id dedupe resolves the overlap), marks pending
//! counterpart messages read at open, and runs a receive loop until
//! cancelled. `ChatListSession` does the same for the chat list, turning
//! per-user insert events into aggregator rebuilds published over a
//! watch channel. Both tear down through a `CancellationToken`; no event
//! is applied after `close`.

use duolog_types::error::ChatError;
use duolog_types::event::ChatEvent;
use duolog_types::message::Message;
use duolog_types::summary::ChatSummary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat_list::ChatListAggregator;
use crate::live::feed::MessageFeed;
use crate::live::view::{ChatView, RemoteOutcome};
use crate::read::ReadTracker;
use crate::repository::{ConversationRepository, MessageRepository, ProfileStore};
use crate::store::MessageStore;

/// Retry policy for resyncing a lagged live subscription.
#[derive(Debug, Clone, Copy)]
pub struct ResyncPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for ResyncPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// A live subscription for one open conversation view.
pub struct LiveSession<M: MessageRepository> {
    view: Arc<Mutex<ChatView>>,
    store: MessageStore<M>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<M> LiveSession<M>
where
    M: MessageRepository + Clone + 'static,
{
    /// Open the conversation for `viewer`: hydrate history, mark pending
    /// counterpart messages read, and start the receive loop.
    pub async fn open(
        store: MessageStore<M>,
        tracker: ReadTracker<M>,
        viewer: Uuid,
        conversation_id: Uuid,
        policy: ResyncPolicy,
    ) -> Result<Self, ChatError> {
        // Subscribe first so nothing slips between the history read and
        // the first recv; duplicates are dropped by id.
        let events = store.feed().subscribe_conversation(conversation_id);

        let mut view = ChatView::new(viewer, conversation_id);
        view.hydrate(store.list(conversation_id).await?);

        let pending = view.unread_ids();
        if !pending.is_empty() {
            tracker.mark_read(viewer, &pending).await?;
        }

        let view = Arc::new(Mutex::new(view));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            Arc::clone(&view),
            store.clone(),
            tracker,
            events,
            conversation_id,
            viewer,
            policy,
            cancel.clone(),
        ));

        Ok(Self {
            view,
            store,
            cancel,
            task: Some(task),
        })
    }

    /// Optimistic send: persist through the store, then record the
    /// message locally so the echoed feed event is deduplicated.
    pub async fn send(&self, content: &str) -> Result<Message, ChatError> {
        let (conversation_id, viewer) = {
            let view = self.view.lock().await;
            (view.conversation_id(), view.viewer())
        };
        let message = self.store.append(conversation_id, viewer, content).await?;
        self.view.lock().await.apply_local(message.clone());
        Ok(message)
    }

    /// Snapshot of the rendered message list.
    pub async fn messages(&self) -> Vec<Message> {
        self.view.lock().await.messages().to_vec()
    }

    /// Whether live delivery gave up after exhausting resync retries.
    pub async fn is_live_unavailable(&self) -> bool {
        self.view.lock().await.is_live_unavailable()
    }

    /// Stop the receive loop and wait for it to finish. After this
    /// returns, no further event is applied to the view.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<M: MessageRepository> Drop for LiveSession<M> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
async fn receive_loop<M>(
    view: Arc<Mutex<ChatView>>,
    store: MessageStore<M>,
    tracker: ReadTracker<M>,
    mut events: broadcast::Receiver<ChatEvent>,
    conversation_id: Uuid,
    viewer: Uuid,
    policy: ResyncPolicy,
    cancel: CancellationToken,
) where
    M: MessageRepository + Clone + 'static,
{
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(ChatEvent::MessageInserted { message, .. }) => {
                let outcome = view.lock().await.apply_remote(message.clone());
                if outcome == (RemoteOutcome::Merged { mark_read: true }) {
                    // Displayed on arrival, so the receipt fires now.
                    if let Err(e) = tracker.mark_read(viewer, &[message.id]).await {
                        warn!(message_id = %message.id, error = %e, "read receipt failed");
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(conversation_id = %conversation_id, skipped, "live feed lagged, resyncing");
                if !resync(&view, &store, conversation_id, policy, &cancel).await {
                    view.lock().await.set_live_unavailable();
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!(conversation_id = %conversation_id, "live session receive loop stopped");
}

/// Refetch full history with exponential backoff. Returns false once the
/// retry budget is exhausted or the session is cancelled.
async fn resync<M>(
    view: &Arc<Mutex<ChatView>>,
    store: &MessageStore<M>,
    conversation_id: Uuid,
    policy: ResyncPolicy,
    cancel: &CancellationToken,
) -> bool
where
    M: MessageRepository,
{
    let mut backoff = policy.initial_backoff;
    for attempt in 1..=policy.max_retries {
        match store.list(conversation_id).await {
            Ok(history) => {
                view.lock().await.hydrate(history);
                return true;
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, attempt, error = %e, "resync failed");
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff *= 2;
    }
    false
}

/// A live subscription for one user's chat list.
///
/// Every insert event on the user's topic triggers a full aggregator
/// rebuild; the fresh snapshot goes out over the watch channel. Rebuild
/// failures keep the previous snapshot and log a warning.
pub struct ChatListSession {
    snapshots: watch::Receiver<Vec<ChatSummary>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChatListSession {
    pub async fn open<C, M, P>(
        aggregator: ChatListAggregator<C, M, P>,
        feed: &MessageFeed,
        user: Uuid,
    ) -> Result<Self, ChatError>
    where
        C: ConversationRepository + Clone + 'static,
        M: MessageRepository + Clone + 'static,
        P: ProfileStore + Clone + 'static,
    {
        let mut events = feed.subscribe_user(user);
        let initial = aggregator.build(user).await?;
        let (tx, snapshots) = watch::channel(initial);

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    // Any insert on the user topic invalidates the list;
                    // a lag just means more than one did.
                    Ok(_) | Err(RecvError::Lagged(_)) => match aggregator.build(user).await {
                        Ok(list) => {
                            if tx.send(list).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(user = %user, error = %e, "chat list rebuild failed");
                        }
                    },
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(user = %user, "chat list session stopped");
        });

        Ok(Self {
            snapshots,
            cancel,
            task: Some(task),
        })
    }

    /// Watch handle for list snapshots. The current value is always the
    /// latest successfully built list.
    pub fn snapshots(&self) -> watch::Receiver<Vec<ChatSummary>> {
        self.snapshots.clone()
    }

    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ChatListSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
