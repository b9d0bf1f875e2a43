//! [`DocumentStore`] backed by the local SQLite [`Database`].
//!
//! The connection lives behind a mutex; each trait call takes the lock for
//! one short synchronous operation.  Change notifications are fanned out
//! in-process, so live subscriptions see writes made through this handle
//! (and its clones) only.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use tertulia_shared::{ConversationId, ConversationIndex, IndexEntry, Message, User, UserId, UserPatch};

use crate::database::Database;
use crate::document::{DocumentStore, StoreChange};
use crate::error::{Result, StoreError};
use crate::subscription::{watch, Subscription};

const CHANGE_FEED_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    /// Shared handle to the underlying database, e.g. for local settings.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        lock_db(&self.db)
    }

    fn notify(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }
}

fn lock_db(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>> {
    db.lock()
        .map_err(|e| StoreError::Backend(format!("Lock poisoned: {e}")))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_user(&self, uid: &UserId) -> Result<Option<User>> {
        self.lock()?.get_user(uid)
    }

    async fn upsert_user(&self, uid: &UserId, patch: UserPatch) -> Result<()> {
        self.lock()?.merge_user(uid, patch, true)?;
        self.notify(StoreChange::User(uid.clone()));
        Ok(())
    }

    async fn update_user(&self, uid: &UserId, patch: UserPatch) -> Result<()> {
        self.lock()?.merge_user(uid, patch, false)?;
        self.notify(StoreChange::User(uid.clone()));
        Ok(())
    }

    async fn users_in_name_range(
        &self,
        start: &str,
        end: &str,
        limit: usize,
    ) -> Result<Vec<User>> {
        self.lock()?.users_in_name_range(start, end, limit)
    }

    async fn list_users(&self, limit: usize) -> Result<Vec<User>> {
        self.lock()?.list_users(limit)
    }

    async fn conversation_exists(&self, id: &ConversationId) -> Result<bool> {
        self.lock()?.conversation_exists(id)
    }

    async fn create_conversation(&self, id: &ConversationId) -> Result<()> {
        self.lock()?.create_conversation(id)
    }

    async fn put_message(&self, id: &ConversationId, message: &Message) -> Result<()> {
        self.lock()?.put_message(id, message)?;
        debug!(conversation = %id, message = %message.id, "message stored");
        self.notify(StoreChange::Messages(id.clone()));
        Ok(())
    }

    async fn get_message(&self, id: &ConversationId, message_id: Uuid) -> Result<Option<Message>> {
        self.lock()?.get_message(id, message_id)
    }

    async fn messages(&self, id: &ConversationId) -> Result<Vec<Message>> {
        self.lock()?.messages_for_conversation(id)
    }

    async fn subscribe_messages(&self, id: &ConversationId) -> Result<Subscription<Vec<Message>>> {
        let db = self.db.clone();
        let conversation = id.clone();
        Ok(watch(
            self.changes.subscribe(),
            StoreChange::Messages(id.clone()),
            move || lock_db(&db)?.messages_for_conversation(&conversation),
        ))
    }

    async fn get_index(&self, uid: &UserId) -> Result<Option<ConversationIndex>> {
        self.lock()?.get_index(uid)
    }

    async fn create_index(&self, uid: &UserId) -> Result<()> {
        self.lock()?.create_index(uid)?;
        self.notify(StoreChange::Index(uid.clone()));
        Ok(())
    }

    async fn merge_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
    ) -> Result<()> {
        self.lock()?.merge_index_entry(uid, conversation, patch, true)?;
        self.notify(StoreChange::Index(uid.clone()));
        Ok(())
    }

    async fn update_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
    ) -> Result<()> {
        self.lock()?.merge_index_entry(uid, conversation, patch, false)?;
        self.notify(StoreChange::Index(uid.clone()));
        Ok(())
    }

    async fn subscribe_index(&self, uid: &UserId) -> Result<Subscription<ConversationIndex>> {
        let db = self.db.clone();
        let owner = uid.clone();
        Ok(watch(
            self.changes.subscribe(),
            StoreChange::Index(uid.clone()),
            move || Ok(lock_db(&db)?.get_index(&owner)?.unwrap_or_default()),
        ))
    }
}
