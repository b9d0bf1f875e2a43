//! In-process document store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use tertulia_shared::{ConversationId, ConversationIndex, IndexEntry, Message, User, UserId, UserPatch};

use crate::document::{DocumentStore, StoreChange};
use crate::error::{Result, StoreError};
use crate::subscription::{watch, Subscription};

const CHANGE_FEED_CAPACITY: usize = 1024;

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    // insertion order is the tie-break for equal dates
    conversations: HashMap<ConversationId, Vec<Message>>,
    indexes: HashMap<UserId, ConversationIndex>,
    unreachable: HashSet<UserId>,
    sealed: HashSet<ConversationId>,
}

impl MemoryState {
    fn sorted_messages(&self, id: &ConversationId) -> Vec<Message> {
        let mut messages = self.conversations.get(id).cloned().unwrap_or_default();
        messages.sort_by_key(|m| m.date);
        messages
    }

    fn check_reachable(&self, collection: &str, uid: &UserId) -> Result<()> {
        if self.unreachable.contains(uid) {
            return Err(StoreError::Backend(format!("permission denied for {collection}/{uid}")));
        }
        Ok(())
    }

    fn check_readable(&self, id: &ConversationId) -> Result<()> {
        if self.sealed.contains(id) {
            return Err(StoreError::Backend(format!("permission denied for chats/{id}")));
        }
        Ok(())
    }
}

/// Document store kept entirely in memory.  Cheap to clone; clones share
/// state and change feed.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            changes,
        }
    }

    /// Make every write to `uid`'s user and index documents fail with a
    /// backend error, as a permission or transport failure would.
    pub fn set_unreachable(&self, uid: &UserId, unreachable: bool) {
        if let Ok(mut state) = self.state.lock() {
            if unreachable {
                state.unreachable.insert(uid.clone());
            } else {
                state.unreachable.remove(uid);
            }
        }
    }

    /// Make reads of and subscriptions to conversation `id` fail with a
    /// backend error.
    pub fn set_conversation_unreachable(&self, id: &ConversationId, unreachable: bool) {
        if let Ok(mut state) = self.state.lock() {
            if unreachable {
                state.sealed.insert(id.clone());
            } else {
                state.sealed.remove(id);
            }
        }
    }

    /// Number of live subscriptions currently attached to the change feed.
    pub fn active_subscriptions(&self) -> usize {
        self.changes.receiver_count()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        lock_state(&self.state)
    }

    fn notify(&self, change: StoreChange) {
        // No receivers simply means nobody is watching.
        let _ = self.changes.send(change);
    }

    fn write_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
        create_missing: bool,
    ) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.check_reachable("userChats", uid)?;
            if !create_missing && !state.indexes.contains_key(uid) {
                return Err(StoreError::not_found("userChats", uid));
            }
            state
                .indexes
                .entry(uid.clone())
                .or_default()
                .merge_entry(conversation.clone(), patch);
        }
        debug!(user = %uid, conversation = %conversation, "index entry written");
        self.notify(StoreChange::Index(uid.clone()));
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> Result<MutexGuard<'_, MemoryState>> {
    state
        .lock()
        .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user(&self, uid: &UserId) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(uid).cloned())
    }

    async fn upsert_user(&self, uid: &UserId, patch: UserPatch) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.check_reachable("users", uid)?;
            match state.users.get_mut(uid) {
                Some(user) => user.apply(patch),
                None => {
                    state
                        .users
                        .insert(uid.clone(), User::from_patch(uid.clone(), patch));
                }
            }
        }
        self.notify(StoreChange::User(uid.clone()));
        Ok(())
    }

    async fn update_user(&self, uid: &UserId, patch: UserPatch) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.check_reachable("users", uid)?;
            let user = state
                .users
                .get_mut(uid)
                .ok_or_else(|| StoreError::not_found("users", uid))?;
            user.apply(patch);
        }
        self.notify(StoreChange::User(uid.clone()));
        Ok(())
    }

    async fn users_in_name_range(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<User>> {
        let state = self.lock()?;
        let mut found: Vec<User> = state
            .users
            .values()
            .filter(|u| u.display_name_lower.as_str() >= start && u.display_name_lower.as_str() < end)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.display_name_lower.cmp(&b.display_name_lower));
        found.truncate(limit);
        Ok(found)
    }

    async fn list_users(&self, limit: usize) -> Result<Vec<User>> {
        let state = self.lock()?;
        Ok(state.users.values().take(limit).cloned().collect())
    }

    async fn conversation_exists(&self, id: &ConversationId) -> Result<bool> {
        Ok(self.lock()?.conversations.contains_key(id))
    }

    async fn create_conversation(&self, id: &ConversationId) -> Result<()> {
        self.lock()?.conversations.entry(id.clone()).or_default();
        Ok(())
    }

    async fn put_message(&self, id: &ConversationId, message: &Message) -> Result<()> {
        {
            let mut state = self.lock()?;
            let log = state.conversations.entry(id.clone()).or_default();
            match log.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message.clone(),
                None => log.push(message.clone()),
            }
        }
        self.notify(StoreChange::Messages(id.clone()));
        Ok(())
    }

    async fn get_message(&self, id: &ConversationId, message_id: Uuid) -> Result<Option<Message>> {
        let state = self.lock()?;
        Ok(state
            .conversations
            .get(id)
            .and_then(|log| log.iter().find(|m| m.id == message_id))
            .cloned())
    }

    async fn messages(&self, id: &ConversationId) -> Result<Vec<Message>> {
        let state = self.lock()?;
        state.check_readable(id)?;
        Ok(state.sorted_messages(id))
    }

    async fn subscribe_messages(&self, id: &ConversationId) -> Result<Subscription<Vec<Message>>> {
        self.lock()?.check_readable(id)?;
        let state = self.state.clone();
        let conversation = id.clone();
        Ok(watch(
            self.changes.subscribe(),
            StoreChange::Messages(id.clone()),
            move || Ok(lock_state(&state)?.sorted_messages(&conversation)),
        ))
    }

    async fn get_index(&self, uid: &UserId) -> Result<Option<ConversationIndex>> {
        Ok(self.lock()?.indexes.get(uid).cloned())
    }

    async fn create_index(&self, uid: &UserId) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.check_reachable("userChats", uid)?;
            state.indexes.entry(uid.clone()).or_default();
        }
        self.notify(StoreChange::Index(uid.clone()));
        Ok(())
    }

    async fn merge_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
    ) -> Result<()> {
        self.write_index_entry(uid, conversation, patch, true)
    }

    async fn update_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
    ) -> Result<()> {
        self.write_index_entry(uid, conversation, patch, false)
    }

    async fn subscribe_index(&self, uid: &UserId) -> Result<Subscription<ConversationIndex>> {
        let state = self.state.clone();
        let owner = uid.clone();
        Ok(watch(
            self.changes.subscribe(),
            StoreChange::Index(uid.clone()),
            move || Ok(lock_state(&state)?.indexes.get(&owner).cloned().unwrap_or_default()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tertulia_shared::{LastMessage, PeerInfo};

    fn message(sender: &str, text: &str, offset_ms: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            text: text.into(),
            sender_id: UserId::new(sender),
            sender_display_name: sender.into(),
            sender_photo_url: String::new(),
            date: Utc::now() + Duration::milliseconds(offset_ms),
            img: None,
            audio: None,
            reply_to: None,
            is_deleted: false,
        }
    }

    fn named(name: &str) -> UserPatch {
        UserPatch {
            display_name: Some(name.into()),
            ..UserPatch::default()
        }
    }

    #[tokio::test]
    async fn messages_are_ordered_by_date() {
        let store = MemoryStore::new();
        let conv = ConversationId::new("a1b2");
        store.put_message(&conv, &message("a1", "second", 10)).await.unwrap();
        store.put_message(&conv, &message("b2", "first", 0)).await.unwrap();

        let texts: Vec<_> = store.messages(&conv).await.unwrap().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[tokio::test]
    async fn unreachable_conversation_rejects_reads() {
        let store = MemoryStore::new();
        let conv = ConversationId::new("a1b2");
        store.set_conversation_unreachable(&conv, true);
        assert!(store.messages(&conv).await.is_err());
        assert!(store.subscribe_messages(&conv).await.is_err());
        assert_eq!(store.active_subscriptions(), 0);

        store.set_conversation_unreachable(&conv, false);
        assert!(store.subscribe_messages(&conv).await.is_ok());
    }

    #[tokio::test]
    async fn update_requires_existing_index() {
        let store = MemoryStore::new();
        let uid = UserId::new("a1");
        let conv = ConversationId::new("a1b2");
        let patch = IndexEntry::with_last_message(LastMessage { text: "hola".into() }, Utc::now());

        let err = store.update_index_entry(&uid, &conv, patch.clone()).await.unwrap_err();
        assert!(err.is_not_found());

        store.create_index(&uid).await.unwrap();
        store.update_index_entry(&uid, &conv, patch).await.unwrap();
        let index = store.get_index(&uid).await.unwrap().unwrap();
        assert_eq!(index.get(&conv).unwrap().last_message.as_ref().unwrap().text, "hola");
    }

    #[tokio::test]
    async fn create_index_keeps_existing_entries() {
        let store = MemoryStore::new();
        let uid = UserId::new("a1");
        let conv = ConversationId::new("a1b2");
        let peer = PeerInfo::user(&UserId::new("b2"), "Beto", "");
        store
            .merge_index_entry(&uid, &conv, IndexEntry::with_peer(peer, Utc::now()))
            .await
            .unwrap();
        store.create_index(&uid).await.unwrap();
        assert_eq!(store.get_index(&uid).await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn name_range_is_half_open() {
        let store = MemoryStore::new();
        store.upsert_user(&UserId::new("1"), named("Ana")).await.unwrap();
        store.upsert_user(&UserId::new("2"), named("Andrés")).await.unwrap();
        store.upsert_user(&UserId::new("3"), named("Beto")).await.unwrap();

        let found = store.users_in_name_range("an", "ao", 10).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.display_name.as_str()).collect();
        assert_eq!(names, ["Ana", "Andrés"]);

        let found = store.users_in_name_range("ana", "beto", 10).await.unwrap();
        assert!(found.iter().all(|u| u.display_name != "Beto"));
    }

    #[tokio::test]
    async fn unreachable_user_rejects_index_writes() {
        let store = MemoryStore::new();
        let uid = UserId::new("m2");
        store.set_unreachable(&uid, true);
        let err = store
            .merge_index_entry(&uid, &ConversationId::new("g"), IndexEntry::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn subscription_delivers_initial_and_updates() {
        let store = MemoryStore::new();
        let conv = ConversationId::new("a1b2");
        store.put_message(&conv, &message("a1", "hola", 0)).await.unwrap();

        let mut sub = store.subscribe_messages(&conv).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 1);

        store.put_message(&conv, &message("b2", "qué tal", 5)).await.unwrap();
        assert_eq!(sub.next().await.unwrap().len(), 2);

        // Writes to other conversations do not wake this subscription.
        store
            .put_message(&ConversationId::new("other"), &message("x", "y", 0))
            .await
            .unwrap();
        assert!(sub.try_next().is_none());
    }
}
