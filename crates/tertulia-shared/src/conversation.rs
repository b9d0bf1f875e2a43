//! Conversation identity.
//!
//! Both sides of a two-party conversation compute its id on their own, so the
//! derivation must not depend on who asks.

use crate::model::PeerInfo;
use crate::types::{ConversationId, UserId};

/// Map the current user and a chat target to the conversation id.
///
/// Groups keep the id assigned at creation.  Two-party conversations use the
/// two uids concatenated, lexicographically smaller first.
pub fn resolve(current: &UserId, target: &PeerInfo) -> ConversationId {
    if target.is_group {
        return ConversationId::new(target.id.clone());
    }
    direct_conversation_id(current, &target.user_id())
}

pub fn direct_conversation_id(a: &UserId, b: &UserId) -> ConversationId {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    ConversationId::new(format!("{}{}", low.as_str(), high.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> PeerInfo {
        PeerInfo::user(&UserId::new(id), id, "")
    }

    #[test]
    fn direct_id_is_commutative() {
        let pairs = [("a1", "b2"), ("zeta", "alpha"), ("u9", "u10"), ("", "x")];
        for (a, b) in pairs {
            let ab = resolve(&UserId::new(a), &user(b));
            let ba = resolve(&UserId::new(b), &user(a));
            assert_eq!(ab, ba, "{a} / {b}");
        }
    }

    #[test]
    fn first_contact_scenario() {
        let id = resolve(&UserId::new("a1"), &user("b2"));
        assert_eq!(id.as_str(), "a1b2");
        let id = resolve(&UserId::new("b2"), &user("a1"));
        assert_eq!(id.as_str(), "a1b2");
    }

    #[test]
    fn group_id_is_returned_unchanged() {
        let gid = ConversationId::new("7f1c-group");
        let group = PeerInfo::group(&gid, "Amigos", "", &UserId::new("a1"));
        for caller in ["a1", "b2", "zz"] {
            assert_eq!(resolve(&UserId::new(caller), &group), gid);
        }
    }
}
