use thiserror::Error;
use uuid::Uuid;

use tertulia_shared::ModelError;
use tertulia_store::StoreError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("No conversation is active")]
    NoActiveConversation,

    /// A user search matched nobody.  Shown inline, never retried.
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    #[error("Only the sender can delete message {0}")]
    NotMessageAuthor(Uuid),

    /// Attachment transfer failed; nothing was written.
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Invalid input: {0}")]
    Model(#[from] ModelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl ClientError {
    /// Whether the failure came from a missing document in the store.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
