//! # tertulia-shared
//!
//! Domain types shared by every Tertulia crate: identifiers, the persisted
//! document shapes (users, messages, conversation index entries), the
//! conversation id resolver and presence status derivation.

pub mod constants;
pub mod conversation;
pub mod error;
pub mod model;
pub mod presence;
pub mod time;
pub mod types;

pub use conversation::resolve;
pub use error::ModelError;
pub use model::*;
pub use presence::PresenceStatus;
pub use types::{ConversationId, UserId};
