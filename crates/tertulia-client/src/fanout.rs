//! Index reconciliation.
//!
//! There is no membership list anywhere: a user takes part in a
//! conversation because their own index holds an entry for it.  Every write
//! that keeps those per-participant copies in step goes through
//! [`IndexFanout`], so a coordinated multi-document writer can replace
//! [`PerParticipantFanout`] without touching callers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::debug;

use tertulia_shared::{ConversationId, IndexEntry, LastMessage, PeerInfo, User, UserId};
use tertulia_store::{DocumentStore, Result as StoreResult};

use crate::best_effort::BestEffort;

#[async_trait]
pub trait IndexFanout: Send + Sync {
    /// Point both participants' entries for a new two-party conversation at
    /// each other.  Fails with not-found when either index is missing.
    async fn link_direct(
        &self,
        conversation_id: &ConversationId,
        me: &User,
        peer: &User,
        date: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Publish the preview of a freshly sent message.
    async fn record_send(
        &self,
        conversation_id: &ConversationId,
        sender: &UserId,
        peer: &PeerInfo,
        summary: LastMessage,
        date: DateTime<Utc>,
    ) -> BestEffort;

    /// Write the shared group metadata into every member's index.
    async fn announce_group(
        &self,
        group_id: &ConversationId,
        metadata: &PeerInfo,
        members: &[UserId],
        date: DateTime<Utc>,
    ) -> BestEffort;
}

/// One independent write per participant, no coordination between them.
pub struct PerParticipantFanout {
    store: Arc<dyn DocumentStore>,
}

impl PerParticipantFanout {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IndexFanout for PerParticipantFanout {
    async fn link_direct(
        &self,
        conversation_id: &ConversationId,
        me: &User,
        peer: &User,
        date: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.store
            .update_index_entry(
                &me.uid,
                conversation_id,
                IndexEntry::with_peer(peer.peer_info(), date),
            )
            .await?;
        self.store
            .update_index_entry(
                &peer.uid,
                conversation_id,
                IndexEntry::with_peer(me.peer_info(), date),
            )
            .await?;
        debug!(conversation = %conversation_id, "Direct conversation linked");
        Ok(())
    }

    async fn record_send(
        &self,
        conversation_id: &ConversationId,
        sender: &UserId,
        peer: &PeerInfo,
        summary: LastMessage,
        date: DateTime<Utc>,
    ) -> BestEffort {
        let mut outcome = BestEffort::new("last-message");
        let patch = IndexEntry::with_last_message(summary, date);

        let result = self
            .store
            .update_index_entry(sender, conversation_id, patch.clone())
            .await;
        outcome.record(sender, result);

        // group previews stay with the sender
        if !peer.is_group {
            let peer_uid = peer.user_id();
            let result = self
                .store
                .update_index_entry(&peer_uid, conversation_id, patch)
                .await;
            outcome.record(&peer_uid, result);
        }

        outcome
    }

    async fn announce_group(
        &self,
        group_id: &ConversationId,
        metadata: &PeerInfo,
        members: &[UserId],
        date: DateTime<Utc>,
    ) -> BestEffort {
        let entry = IndexEntry::with_peer(metadata.clone(), date);
        let writes = members.iter().map(|uid| {
            let entry = entry.clone();
            async move {
                let result = self.store.update_index_entry(uid, group_id, entry).await;
                (uid, result)
            }
        });

        let mut outcome = BestEffort::new("group-fanout");
        for (uid, result) in join_all(writes).await {
            outcome.record(uid, result);
        }
        debug!(
            group = %group_id,
            members = members.len(),
            failed = outcome.failures().len(),
            "Group announced"
        );
        outcome
    }
}
