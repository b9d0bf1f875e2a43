//! Group creation.
//!
//! A group is a conversation with an opaque id whose metadata lives in each
//! member's index entry.  Creation writes that entry into every member's
//! index in parallel; members whose write fails simply do not see the group.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tertulia_shared::{ConversationId, PeerInfo, User, UserId};
use tertulia_store::DocumentStore;

use crate::best_effort::BestEffort;
use crate::error::{ClientError, Result};
use crate::fanout::IndexFanout;

/// Members picked so far for a group that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct GroupBuilder {
    name: String,
    members: Vec<PeerInfo>,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a found user.  Returns `false` for `me` and for users already
    /// picked.
    pub fn add(&mut self, me: &UserId, user: &User) -> bool {
        if &user.uid == me || self.members.iter().any(|m| m.id == user.uid.as_str()) {
            return false;
        }
        self.members.push(user.peer_info());
        true
    }

    pub fn remove(&mut self, uid: &UserId) {
        self.members.retain(|m| m.id != uid.as_str());
    }

    pub fn members(&self) -> &[PeerInfo] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(PeerInfo::user_id).collect()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.members.clear();
    }
}

#[derive(Debug, Clone)]
pub struct GroupCreated {
    pub group_id: ConversationId,
    pub metadata: PeerInfo,
    pub fanout: BestEffort,
}

pub struct GroupManager {
    store: Arc<dyn DocumentStore>,
    fanout: Arc<dyn IndexFanout>,
    photo_url: String,
}

impl GroupManager {
    pub fn new(store: Arc<dyn DocumentStore>, fanout: Arc<dyn IndexFanout>, photo_url: String) -> Self {
        Self {
            store,
            fanout,
            photo_url,
        }
    }

    /// Create a group named `name` with `initiator` as admin.  The
    /// initiator is always a member.
    pub async fn create_group(
        &self,
        name: &str,
        initiator: &User,
        members: &[UserId],
    ) -> Result<GroupCreated> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::InvalidGroup("name must not be blank".into()));
        }

        let mut everyone = vec![initiator.uid.clone()];
        for uid in members {
            if !everyone.contains(uid) {
                everyone.push(uid.clone());
            }
        }
        if everyone.len() < 2 {
            return Err(ClientError::InvalidGroup("at least one other member is required".into()));
        }

        let group_id = ConversationId::generate();
        self.store.create_conversation(&group_id).await?;

        let metadata = PeerInfo::group(&group_id, name, &self.photo_url, &initiator.uid);
        let fanout = self
            .fanout
            .announce_group(&group_id, &metadata, &everyone, Utc::now())
            .await;

        info!(
            group = %group_id,
            members = everyone.len(),
            reached = fanout.succeeded(),
            "Group created"
        );
        Ok(GroupCreated {
            group_id,
            metadata,
            fanout,
        })
    }
}
