//! Persisted document shapes.
//!
//! Field names follow the stored documents exactly (camelCase, `photoURL`,
//! `userInfo`) because every client reads back the same shapes on reload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{PHOTO_PLACEHOLDER, VOICE_NOTE_PLACEHOLDER};
use crate::types::{ConversationId, UserId};

fn is_false(b: &bool) -> bool {
    !*b
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Signed-in identity as handed over by the authentication provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthIdentity {
    pub uid: UserId,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user profile document, keyed by uid.
///
/// `display_name_lower` is never written directly: [`User::apply`] derives it
/// from `display_name` on every write so prefix search stays in sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub display_name_lower: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub profile_completed: bool,
}

impl User {
    /// Build a fresh document from a merge patch.
    pub fn from_patch(uid: UserId, patch: UserPatch) -> Self {
        let mut user = Self {
            uid,
            display_name: String::new(),
            display_name_lower: String::new(),
            email: None,
            photo_url: String::new(),
            is_online: false,
            last_seen: None,
            created_at: None,
            bio: None,
            location: None,
            work: None,
            education: None,
            interests: Vec::new(),
            profile_completed: false,
        };
        user.apply(patch);
        user
    }

    /// Merge a partial update.  Fields the patch leaves unset are untouched.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.display_name {
            self.display_name_lower = name.to_lowercase();
            self.display_name = name;
        }
        if let Some(email) = patch.email {
            self.email = Some(email);
        }
        if let Some(photo) = patch.photo_url {
            self.photo_url = photo;
        }
        if let Some(online) = patch.is_online {
            self.is_online = online;
        }
        if let Some(seen) = patch.last_seen {
            self.last_seen = Some(seen);
        }
        if let Some(created) = patch.created_at {
            self.created_at = Some(created);
        }
        if let Some(bio) = patch.bio {
            self.bio = Some(bio);
        }
        if let Some(location) = patch.location {
            self.location = Some(location);
        }
        if let Some(work) = patch.work {
            self.work = Some(work);
        }
        if let Some(education) = patch.education {
            self.education = Some(education);
        }
        if let Some(interests) = patch.interests {
            self.interests = interests;
        }
        if let Some(completed) = patch.profile_completed {
            self.profile_completed = completed;
        }
    }

    /// Peer-info snapshot used when this user appears in someone's index.
    pub fn peer_info(&self) -> PeerInfo {
        PeerInfo::user(&self.uid, &self.display_name, &self.photo_url)
    }
}

/// Merge-style partial update of a [`User`] document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub is_online: Option<bool>,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub work: Option<String>,
    pub education: Option<String>,
    pub interests: Option<Vec<String>>,
    pub profile_completed: Option<bool>,
}

impl UserPatch {
    pub fn presence(is_online: bool, at: DateTime<Utc>) -> Self {
        Self {
            is_online: Some(is_online),
            last_seen: Some(at),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation index
// ---------------------------------------------------------------------------

/// Who a conversation is with: the other user, or the group itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    #[serde(rename = "uid", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<UserId>,
}

impl PeerInfo {
    pub fn user(uid: &UserId, display_name: &str, photo_url: &str) -> Self {
        Self {
            id: uid.0.clone(),
            display_name: display_name.to_string(),
            photo_url: photo_url.to_string(),
            is_group: false,
            admin_id: None,
        }
    }

    pub fn group(id: &ConversationId, name: &str, photo_url: &str, admin: &UserId) -> Self {
        Self {
            id: id.0.clone(),
            display_name: name.to_string(),
            photo_url: photo_url.to_string(),
            is_group: true,
            admin_id: Some(admin.clone()),
        }
    }

    /// The peer's uid.  Only meaningful for two-party conversations.
    pub fn user_id(&self) -> UserId {
        UserId(self.id.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastMessage {
    pub text: String,
}

impl LastMessage {
    /// Preview shown in the conversation list for a freshly sent message.
    pub fn summarize(text: &str, has_image: bool, has_audio: bool) -> Self {
        let text = if has_audio {
            VOICE_NOTE_PLACEHOLDER.to_string()
        } else if !text.trim().is_empty() {
            text.to_string()
        } else if has_image {
            PHOTO_PLACEHOLDER.to_string()
        } else {
            String::new()
        };
        Self { text }
    }
}

/// One participant's denormalized view of one conversation.  Every field is
/// optional so the same type doubles as a merge patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<PeerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl IndexEntry {
    pub fn with_peer(peer: PeerInfo, date: DateTime<Utc>) -> Self {
        Self {
            user_info: Some(peer),
            last_message: None,
            date: Some(date),
        }
    }

    pub fn with_last_message(last_message: LastMessage, date: DateTime<Utc>) -> Self {
        Self {
            user_info: None,
            last_message: Some(last_message),
            date: Some(date),
        }
    }

    /// Overwrite the fields `patch` sets, keep the rest.
    pub fn merge(&mut self, patch: IndexEntry) {
        if patch.user_info.is_some() {
            self.user_info = patch.user_info;
        }
        if patch.last_message.is_some() {
            self.last_message = patch.last_message;
        }
        if patch.date.is_some() {
            self.date = patch.date;
        }
    }
}

/// A user's private index document: conversation id -> entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationIndex(pub BTreeMap<ConversationId, IndexEntry>);

impl ConversationIndex {
    pub fn get(&self, id: &ConversationId) -> Option<&IndexEntry> {
        self.0.get(id)
    }

    pub fn merge_entry(&mut self, id: ConversationId, patch: IndexEntry) {
        self.0.entry(id).or_default().merge(patch);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConversationId, &IndexEntry)> {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Snapshot of a quoted message, frozen at send time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub id: Uuid,
    pub text: String,
    pub sender_display_name: String,
}

/// One entry of a conversation's message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    #[serde(default)]
    pub text: String,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_display_name: String,
    #[serde(rename = "senderPhotoURL", default)]
    pub sender_photo_url: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
}

impl Message {
    /// Blank the content and mark the message deleted.  Id, sender and date
    /// survive, and applying it twice changes nothing.
    pub fn soft_delete(&mut self) {
        self.text.clear();
        self.img = None;
        self.audio = None;
        self.reply_to = None;
        self.is_deleted = true;
    }

    pub fn reply_ref(&self) -> ReplyRef {
        ReplyRef {
            id: self.id,
            text: self.text.clone(),
            sender_display_name: self.sender_display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: Uuid::new_v4(),
            text: "hola".into(),
            sender_id: UserId::new("a1"),
            sender_display_name: "Ana".into(),
            sender_photo_url: "https://example.com/a.png".into(),
            date: Utc::now(),
            img: Some("https://example.com/i.png".into()),
            audio: None,
            reply_to: Some(ReplyRef {
                id: Uuid::new_v4(),
                text: "¿qué tal?".into(),
                sender_display_name: "Beto".into(),
            }),
            is_deleted: false,
        }
    }

    #[test]
    fn display_name_lower_follows_display_name() {
        let mut user = User::from_patch(
            UserId::new("a1"),
            UserPatch {
                display_name: Some("Ana María".into()),
                ..UserPatch::default()
            },
        );
        assert_eq!(user.display_name_lower, "ana maría");

        user.apply(UserPatch {
            display_name: Some("ANITA".into()),
            ..UserPatch::default()
        });
        assert_eq!(user.display_name_lower, "anita");
    }

    #[test]
    fn patch_does_not_clobber_unset_fields() {
        let mut user = User::from_patch(
            UserId::new("a1"),
            UserPatch {
                display_name: Some("Ana".into()),
                bio: Some("hola".into()),
                ..UserPatch::default()
            },
        );
        user.apply(UserPatch::presence(true, Utc::now()));
        assert_eq!(user.bio.as_deref(), Some("hola"));
        assert_eq!(user.display_name, "Ana");
        assert!(user.is_online);
    }

    #[test]
    fn summary_placeholders() {
        assert_eq!(LastMessage::summarize("hi", false, false).text, "hi");
        assert_eq!(LastMessage::summarize("", true, false).text, PHOTO_PLACEHOLDER);
        assert_eq!(LastMessage::summarize("mira", true, false).text, "mira");
        assert_eq!(LastMessage::summarize("", false, true).text, VOICE_NOTE_PLACEHOLDER);
        assert_eq!(LastMessage::summarize("  \n", true, false).text, PHOTO_PLACEHOLDER);
    }

    #[test]
    fn soft_delete_is_idempotent_and_keeps_identity() {
        let original = sample_message();
        let mut once = original.clone();
        once.soft_delete();

        assert!(once.is_deleted);
        assert!(once.text.is_empty());
        assert!(once.img.is_none() && once.audio.is_none() && once.reply_to.is_none());
        assert_eq!(once.id, original.id);
        assert_eq!(once.sender_id, original.sender_id);
        assert_eq!(once.date, original.date);

        let mut twice = once.clone();
        twice.soft_delete();
        assert_eq!(once, twice);
    }

    #[test]
    fn index_entry_merge_keeps_peer_info() {
        let now = Utc::now();
        let mut entry = IndexEntry::with_peer(
            PeerInfo::user(&UserId::new("b2"), "Beto", ""),
            now,
        );
        entry.merge(IndexEntry::with_last_message(
            LastMessage { text: "hola".into() },
            now,
        ));
        assert_eq!(entry.user_info.as_ref().map(|p| p.id.as_str()), Some("b2"));
        assert_eq!(entry.last_message.as_ref().map(|m| m.text.as_str()), Some("hola"));
    }

    #[test]
    fn stored_field_names() {
        let json = serde_json::to_value(sample_message()).unwrap();
        for key in ["id", "text", "senderId", "senderDisplayName", "senderPhotoURL", "date", "img", "replyTo"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("audio").is_none());
        assert!(json.get("isDeleted").is_none());

        let group = PeerInfo::group(
            &ConversationId::new("g1"),
            "Amigos",
            "",
            &UserId::new("a1"),
        );
        let json = serde_json::to_value(IndexEntry::with_peer(group, Utc::now())).unwrap();
        assert_eq!(json["userInfo"]["uid"], "g1");
        assert_eq!(json["userInfo"]["isGroup"], true);
        assert_eq!(json["userInfo"]["adminId"], "a1");
    }

    #[test]
    fn peer_info_accepts_id_alias() {
        let peer: PeerInfo =
            serde_json::from_str(r#"{"id":"b2","displayName":"Beto","photoURL":""}"#).unwrap();
        assert_eq!(peer.user_id(), UserId::new("b2"));
        assert!(!peer.is_group);
    }
}
