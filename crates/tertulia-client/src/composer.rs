//! Message composition.
//!
//! A send runs in a fixed order: validate, upload any attachment, append the
//! message to the log, then publish the preview through the index fan-out.
//! An upload failure stops the send before anything is written.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use tertulia_shared::constants::{AUDIO_UPLOAD_PREFIX, IMAGE_UPLOAD_PREFIX};
use tertulia_shared::{ConversationId, LastMessage, Message, PeerInfo, ReplyRef, User};
use tertulia_store::{BlobStorage, DocumentStore};

use crate::best_effort::BestEffort;
use crate::error::{ClientError, Result};
use crate::fanout::IndexFanout;

/// What the user is sending.  Exactly one kind per message.
#[derive(Debug, Clone)]
pub enum OutgoingContent {
    Text(String),
    Image { data: Bytes, caption: String },
    Audio { data: Bytes },
}

impl OutgoingContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(data: impl Into<Bytes>) -> Self {
        Self::Image {
            data: data.into(),
            caption: String::new(),
        }
    }

    pub fn audio(data: impl Into<Bytes>) -> Self {
        Self::Audio { data: data.into() }
    }

    /// Nothing worth sending: blank text and no attachment.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Image { data, caption } => data.is_empty() && caption.trim().is_empty(),
            Self::Audio { data } => data.is_empty(),
        }
    }
}

/// Result of a completed send.
#[derive(Debug, Clone)]
pub struct Sent {
    pub message: Message,
    pub fanout: BestEffort,
}

/// The conversation a send goes to.
#[derive(Debug, Clone)]
pub struct Target<'a> {
    pub conversation_id: &'a ConversationId,
    pub peer: &'a PeerInfo,
}

pub struct Composer {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStorage>,
    fanout: Arc<dyn IndexFanout>,
    max_upload_bytes: usize,
}

impl Composer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStorage>,
        fanout: Arc<dyn IndexFanout>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            store,
            blobs,
            fanout,
            max_upload_bytes,
        }
    }

    /// Send `content` as `sender`.  `Ok(None)` when there was nothing to
    /// send.
    pub async fn send(
        &self,
        sender: &User,
        target: Target<'_>,
        content: OutgoingContent,
        reply_to: Option<ReplyRef>,
    ) -> Result<Option<Sent>> {
        if content.is_empty() {
            return Ok(None);
        }

        let (text, img, audio) = match content {
            OutgoingContent::Text(text) => (text, None, None),
            OutgoingContent::Image { data, caption } => {
                let url = if data.is_empty() {
                    None
                } else {
                    Some(self.upload(IMAGE_UPLOAD_PREFIX, data).await?)
                };
                (caption.trim().to_string(), url, None)
            }
            OutgoingContent::Audio { data } => {
                let url = self.upload(AUDIO_UPLOAD_PREFIX, data).await?;
                (String::new(), None, Some(url))
            }
        };

        let message = Message {
            id: Uuid::new_v4(),
            text,
            sender_id: sender.uid.clone(),
            sender_display_name: sender.display_name.clone(),
            sender_photo_url: sender.photo_url.clone(),
            date: Utc::now(),
            img,
            audio,
            reply_to,
            is_deleted: false,
        };

        self.store.put_message(target.conversation_id, &message).await?;

        let summary = LastMessage::summarize(
            &message.text,
            message.img.is_some(),
            message.audio.is_some(),
        );
        let fanout = self
            .fanout
            .record_send(target.conversation_id, &sender.uid, target.peer, summary, message.date)
            .await;

        info!(
            conversation = %target.conversation_id,
            message = %message.id,
            previews = fanout.succeeded(),
            "Message sent"
        );
        Ok(Some(Sent { message, fanout }))
    }

    /// Soft-delete one of `requester`'s own messages.  Deleting twice is a
    /// no-op.
    pub async fn delete(
        &self,
        requester: &User,
        conversation_id: &ConversationId,
        message_id: Uuid,
    ) -> Result<Message> {
        let mut message = self
            .store
            .get_message(conversation_id, message_id)
            .await?
            .ok_or(ClientError::MessageNotFound(message_id))?;

        if message.sender_id != requester.uid {
            warn!(message = %message_id, uid = %requester.uid, "Refusing to delete someone else's message");
            return Err(ClientError::NotMessageAuthor(message_id));
        }
        if message.is_deleted {
            return Ok(message);
        }

        message.soft_delete();
        self.store.put_message(conversation_id, &message).await?;
        info!(conversation = %conversation_id, message = %message_id, "Message deleted");
        Ok(message)
    }

    async fn upload(&self, prefix: &str, data: Bytes) -> Result<String> {
        if data.len() > self.max_upload_bytes {
            error!(size = data.len(), max = self.max_upload_bytes, "Attachment too large");
            return Err(ClientError::Upload(format!(
                "attachment of {} bytes exceeds {} bytes",
                data.len(),
                self.max_upload_bytes
            )));
        }

        let path = format!("{prefix}/{}", Uuid::new_v4());
        self.blobs.upload(&path, data).await.map_err(|e| {
            error!(path = %path, error = %e, "Attachment upload failed, message not sent");
            ClientError::Upload(e.to_string())
        })
    }
}
