//! Which conversation the session is looking at.

use tertulia_shared::constants::{FEED_DISPLAY_NAME, FEED_MARKER};
use tertulia_shared::{resolve, ConversationId, PeerInfo, UserId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Active {
        conversation_id: ConversationId,
        peer: PeerInfo,
    },
    /// The social wall.  Not a conversation.
    Feed,
}

impl Selection {
    /// Active conversation id, or the `"null"` sentinel.
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::Active {
                conversation_id, ..
            } => conversation_id.clone(),
            Self::None | Self::Feed => ConversationId::none(),
        }
    }

    pub fn peer(&self) -> Option<&PeerInfo> {
        match self {
            Self::Active { peer, .. } => Some(peer),
            _ => None,
        }
    }

    pub fn is_feed(&self) -> bool {
        matches!(self, Self::Feed)
    }

    /// Header label: the peer's name, or the wall's.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Active { peer, .. } => Some(&peer.display_name),
            Self::Feed => Some(FEED_DISPLAY_NAME),
            Self::None => None,
        }
    }
}

/// What the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectTarget {
    Peer(PeerInfo),
    Feed,
    Nothing,
}

impl SelectTarget {
    /// Map a picked list entry to a target.  The feed marker peer id opens
    /// the wall.
    pub fn from_peer(peer: Option<PeerInfo>) -> Self {
        match peer {
            None => Self::Nothing,
            Some(p) if p.id == FEED_MARKER => Self::Feed,
            Some(p) => Self::Peer(p),
        }
    }
}

/// Next selection state.  Without a signed-in user the current state is
/// returned unchanged.
pub fn transition(current_user: Option<&UserId>, state: &Selection, target: SelectTarget) -> Selection {
    let Some(uid) = current_user else {
        return state.clone();
    };

    match target {
        SelectTarget::Peer(peer) => Selection::Active {
            conversation_id: resolve(uid, &peer),
            peer,
        },
        SelectTarget::Feed => Selection::Feed,
        SelectTarget::Nothing => Selection::None,
    }
}
