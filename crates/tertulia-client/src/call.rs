use tertulia_shared::{ConversationId, UserId};

use crate::selection::Selection;

/// What the video SDK needs to join a call: the room is the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRoom {
    pub room_id: ConversationId,
    pub uid: UserId,
    pub display_name: String,
}

pub fn call_room(selection: &Selection, uid: &UserId, display_name: &str) -> Option<CallRoom> {
    match selection {
        Selection::Active {
            conversation_id, ..
        } => Some(CallRoom {
            room_id: conversation_id.clone(),
            uid: uid.clone(),
            display_name: display_name.to_string(),
        }),
        Selection::None | Selection::Feed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tertulia_shared::PeerInfo;

    #[test]
    fn room_is_the_active_conversation() {
        let selection = Selection::Active {
            conversation_id: ConversationId::new("a1b2"),
            peer: PeerInfo::user(&UserId::new("b2"), "Beto", ""),
        };
        let room = call_room(&selection, &UserId::new("a1"), "Ana").unwrap();
        assert_eq!(room.room_id.as_str(), "a1b2");
        assert!(call_room(&Selection::Feed, &UserId::new("a1"), "Ana").is_none());
    }
}
