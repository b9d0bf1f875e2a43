//! The realtime document store contract.
//!
//! Three collections are modelled:
//!
//! - `users/{uid}`: profile documents, range-queryable by lowercase name,
//! - `chats/{conversationId}/messages/{messageId}`: append-mostly message
//!   logs ordered by `date`,
//! - `userChats/{uid}`: each user's private conversation index, a map from
//!   conversation id to [`IndexEntry`].
//!
//! Writes come in two flavours, mirroring the store they stand in for:
//! *merge* writes create the target document when it is missing, *update*
//! writes fail with [`StoreError::NotFound`](crate::StoreError::NotFound)
//! instead.

use async_trait::async_trait;

use tertulia_shared::{ConversationId, ConversationIndex, IndexEntry, Message, User, UserId, UserPatch};
use uuid::Uuid;

use crate::error::Result;
use crate::subscription::Subscription;

/// Change notification fanned out to live subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    User(UserId),
    Messages(ConversationId),
    Index(UserId),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // -- users --------------------------------------------------------------

    async fn get_user(&self, uid: &UserId) -> Result<Option<User>>;

    /// Merge `patch` into the user document, creating it if missing.
    async fn upsert_user(&self, uid: &UserId, patch: UserPatch) -> Result<()>;

    /// Merge `patch` into an existing user document.
    async fn update_user(&self, uid: &UserId, patch: UserPatch) -> Result<()>;

    /// Users whose `displayNameLower` lies in `[start, end)`, ascending.
    async fn users_in_name_range(&self, start: &str, end: &str, limit: usize)
        -> Result<Vec<User>>;

    async fn list_users(&self, limit: usize) -> Result<Vec<User>>;

    // -- conversations ------------------------------------------------------

    async fn conversation_exists(&self, id: &ConversationId) -> Result<bool>;

    /// Create an empty conversation.  No-op when it already exists.
    async fn create_conversation(&self, id: &ConversationId) -> Result<()>;

    /// Write a message into the conversation log, replacing any message
    /// with the same id.
    async fn put_message(&self, id: &ConversationId, message: &Message) -> Result<()>;

    async fn get_message(&self, id: &ConversationId, message_id: Uuid) -> Result<Option<Message>>;

    /// The whole log, ordered by `date` ascending (insertion order on ties).
    async fn messages(&self, id: &ConversationId) -> Result<Vec<Message>>;

    /// Live view of [`DocumentStore::messages`].  The first item is the
    /// current log, every later item a full replacement snapshot.
    async fn subscribe_messages(&self, id: &ConversationId) -> Result<Subscription<Vec<Message>>>;

    // -- conversation index -------------------------------------------------

    async fn get_index(&self, uid: &UserId) -> Result<Option<ConversationIndex>>;

    /// Create an empty index document.  Existing entries are left alone.
    async fn create_index(&self, uid: &UserId) -> Result<()>;

    /// Merge one entry, creating the index document if missing.
    async fn merge_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
    ) -> Result<()>;

    /// Merge one entry into an existing index document.
    async fn update_index_entry(
        &self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
    ) -> Result<()>;

    /// Live view of a user's index.  A missing document reads as empty.
    async fn subscribe_index(&self, uid: &UserId) -> Result<Subscription<ConversationIndex>>;
}
