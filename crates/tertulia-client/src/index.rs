//! The signed-in user's conversation list.
//!
//! [`IndexFeed`] mirrors the user's index document as a list sorted by
//! recency.  [`IndexAggregator`] also covers finding people by name and
//! starting a two-party conversation with them.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tertulia_shared::constants::PREFIX_RANGE_END;
use tertulia_shared::time::optional_clock_label;
use tertulia_shared::{resolve, ConversationId, ConversationIndex, PeerInfo, User, UserId};
use tertulia_store::DocumentStore;

use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventBus};
use crate::fanout::IndexFanout;

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub peer: PeerInfo,
    pub last_message: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl ConversationSummary {
    /// `HH:MM` of the last activity, empty when unknown.
    pub fn time_label<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        optional_clock_label(self.date.as_ref(), tz)
    }
}

/// Flatten an index document into list rows, newest first.  Entries
/// without peer metadata are skipped.
pub fn sorted_summaries(index: &ConversationIndex) -> Vec<ConversationSummary> {
    let mut rows: Vec<ConversationSummary> = index
        .iter()
        .filter_map(|(id, entry)| {
            let Some(peer) = entry.user_info.clone() else {
                debug!(conversation = %id, "Skipping index entry without peer info");
                return None;
            };
            Some(ConversationSummary {
                conversation_id: id.clone(),
                peer,
                last_message: entry.last_message.as_ref().map(|m| m.text.clone()),
                date: entry.date,
            })
        })
        .collect();

    // undated entries sort last
    rows.sort_by_key(|row| Reverse(row.date));
    rows
}

/// Live, sorted view of one user's index.  Stops when dropped.
pub struct IndexFeed {
    owner: UserId,
    rows: watch::Receiver<Vec<ConversationSummary>>,
    task: JoinHandle<()>,
}

impl IndexFeed {
    pub async fn open(store: &dyn DocumentStore, owner: UserId, events: EventBus) -> Result<Self> {
        let mut subscription = store.subscribe_index(&owner).await?;
        let (tx, rows) = watch::channel(Vec::new());

        let task = tokio::spawn(async move {
            while let Some(index) = subscription.next().await {
                let sorted = sorted_summaries(&index);
                let entries = sorted.len();
                tx.send_replace(sorted);
                events.emit(ClientEvent::IndexUpdated { entries });
            }
        });

        info!(uid = %owner, "Conversation index feed opened");
        Ok(Self { owner, rows, task })
    }

    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.rows.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<ConversationSummary>> {
        self.rows.clone()
    }
}

impl Drop for IndexFeed {
    fn drop(&mut self) {
        self.task.abort();
        debug!(uid = %self.owner, "Conversation index feed closed");
    }
}

pub struct IndexAggregator {
    store: Arc<dyn DocumentStore>,
    fanout: Arc<dyn IndexFanout>,
}

impl IndexAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, fanout: Arc<dyn IndexFanout>) -> Self {
        Self { store, fanout }
    }

    /// First user whose lowercase display name starts with `text`.
    pub async fn search_user(&self, text: &str) -> Result<User> {
        let prefix = text.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(ClientError::UserNotFound(text.to_string()));
        }

        let end = format!("{prefix}{PREFIX_RANGE_END}");
        let found = self.store.users_in_name_range(&prefix, &end, 1).await?;
        found
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::UserNotFound(text.to_string()))
    }

    /// Start (or reopen) the two-party conversation between `me` and `peer`.
    ///
    /// When an index document turns out to be missing, both are created and
    /// the whole operation runs once more.
    pub async fn open_conversation(&self, me: &User, peer: &User) -> Result<ConversationId> {
        match self.try_open(me, peer).await {
            Err(e) if e.is_not_found() => {
                warn!(me = %me.uid, peer = %peer.uid, error = %e, "Index missing, creating and retrying");
                self.store.create_index(&me.uid).await?;
                self.store.create_index(&peer.uid).await?;
                self.try_open(me, peer).await
            }
            other => other,
        }
    }

    async fn try_open(&self, me: &User, peer: &User) -> Result<ConversationId> {
        let conversation_id = resolve(&me.uid, &peer.peer_info());

        if !self.store.conversation_exists(&conversation_id).await? {
            self.store.create_conversation(&conversation_id).await?;
            info!(conversation = %conversation_id, "Conversation created");
        }

        self.fanout
            .link_direct(&conversation_id, me, peer, Utc::now())
            .await?;
        Ok(conversation_id)
    }
}
