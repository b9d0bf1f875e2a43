//! Live mirror of the active conversation's message log.
//!
//! A [`MessageStream`] lives exactly as long as the conversation stays
//! selected.  Every snapshot from the store replaces the mirror wholesale.
//! Dropping the stream stops the forwarding task, which in turn drops the
//! store subscription.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use tertulia_shared::{ConversationId, Message, UserId};
use tertulia_store::DocumentStore;

use crate::error::Result;
use crate::events::{ClientEvent, EventBus};

/// Decides which snapshots warrant a new-message alert.
///
/// The first snapshot of a subscription is history and never alerts.  A
/// later snapshot alerts when its trailing message is new and was sent by
/// someone else.
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    seen_first: bool,
    trailing: Option<Uuid>,
}

impl SnapshotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one snapshot.  Returns the message to alert on, if any.
    pub fn observe<'a>(&mut self, snapshot: &'a [Message], me: &UserId) -> Option<&'a Message> {
        let last = snapshot.last();
        let previous = self.trailing;
        self.trailing = last.map(|m| m.id);

        if !self.seen_first {
            self.seen_first = true;
            return None;
        }

        let last = last?;
        if Some(last.id) == previous || &last.sender_id == me {
            return None;
        }
        Some(last)
    }
}

pub struct MessageStream {
    conversation_id: ConversationId,
    mirror: watch::Receiver<Vec<Message>>,
    task: JoinHandle<()>,
}

impl MessageStream {
    /// Subscribe to `conversation_id` on behalf of `me`.
    pub async fn open(
        store: &dyn DocumentStore,
        conversation_id: ConversationId,
        me: UserId,
        events: EventBus,
    ) -> Result<Self> {
        let mut subscription = store.subscribe_messages(&conversation_id).await?;
        let (tx, mirror) = watch::channel(Vec::new());
        let conversation = conversation_id.clone();

        let task = tokio::spawn(async move {
            let mut tracker = SnapshotTracker::new();

            while let Some(snapshot) = subscription.next().await {
                if let Some(message) = tracker.observe(&snapshot, &me) {
                    debug!(conversation = %conversation, message = %message.id, "New message");
                    events.emit(ClientEvent::NewMessage {
                        conversation_id: conversation.clone(),
                        message_id: message.id,
                        sender_id: message.sender_id.clone(),
                    });
                }

                let count = snapshot.len();
                tx.send_replace(snapshot);
                events.emit(ClientEvent::MessagesUpdated {
                    conversation_id: conversation.clone(),
                    count,
                });
            }
        });

        info!(conversation = %conversation_id, "Message stream opened");
        Ok(Self {
            conversation_id,
            mirror,
            task,
        })
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Current mirror.
    pub fn messages(&self) -> Vec<Message> {
        self.mirror.borrow().clone()
    }

    /// Handle for awaiting mirror changes.
    pub fn watch(&self) -> watch::Receiver<Vec<Message>> {
        self.mirror.clone()
    }
}

impl Drop for MessageStream {
    fn drop(&mut self) {
        self.task.abort();
        debug!(conversation = %self.conversation_id, "Message stream closed");
    }
}
