use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use tertulia_shared::{ConversationId, UserId};

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// The active conversation's mirror was replaced.
    #[serde(rename_all = "camelCase")]
    MessagesUpdated {
        conversation_id: ConversationId,
        count: usize,
    },

    /// A message from someone else arrived in the active conversation.
    /// This is the cue for the notification sound.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        conversation_id: ConversationId,
        message_id: Uuid,
        sender_id: UserId,
    },

    #[serde(rename_all = "camelCase")]
    IndexUpdated { entries: usize },

    #[serde(rename_all = "camelCase")]
    SelectionChanged {
        conversation_id: ConversationId,
        feed: bool,
    },

    /// A fire-and-forget presence write did not land.
    #[serde(rename_all = "camelCase")]
    PresenceWriteFailed { uid: UserId, error: String },
}

/// Cloneable sender side of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event listeners");
        }
    }
}
