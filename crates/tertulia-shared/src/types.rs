use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::NO_CONVERSATION_SENTINEL;
use crate::error::ModelError;

// User identity = the opaque uid issued by the authentication provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a uid coming from an untrusted source, rejecting blank values.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyId("user"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Key of a conversation document and of the matching entry in every
/// participant's index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh opaque id for a group conversation.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id reported while no conversation is active.
    pub fn none() -> Self {
        Self(NO_CONVERSATION_SENTINEL.to_string())
    }

    pub fn is_none(&self) -> bool {
        self.0 == NO_CONVERSATION_SENTINEL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank_uid() {
        assert_eq!(UserId::parse("   "), Err(ModelError::EmptyId("user")));
        assert_eq!(UserId::parse(" a1 ").unwrap(), UserId::new("a1"));
    }

    #[test]
    fn sentinel_round_trip() {
        let none = ConversationId::none();
        assert!(none.is_none());
        assert_eq!(none.as_str(), "null");
        assert!(!ConversationId::generate().is_none());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&ConversationId::new("a1b2")).unwrap();
        assert_eq!(json, "\"a1b2\"");
    }
}
