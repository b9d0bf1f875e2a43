//! # tertulia-client
//!
//! Conversation sync and fan-out engine.
//!
//! The engine keeps a signed-in user's view of their conversations in step
//! with a shared realtime document store without any central coordinator:
//!
//! - [`presence`]: login/logout, heartbeat and derived online status,
//! - [`selection`]: the active conversation state machine,
//! - [`stream`]: the live message mirror and new-message alerts,
//! - [`composer`] and [`fanout`]: sending and index preview propagation,
//! - [`index`]: the conversation list, user search and first contact,
//! - [`groups`]: group creation fanned out to every member.
//!
//! [`Client`] ties them together around one [`Session`].

pub mod best_effort;
pub mod call;
pub mod client;
pub mod composer;
pub mod config;
pub mod error;
pub mod events;
pub mod fanout;
pub mod groups;
pub mod index;
pub mod presence;
pub mod profile;
pub mod selection;
pub mod session;
pub mod stream;
pub mod theme;

use tracing_subscriber::{fmt, EnvFilter};

pub use best_effort::BestEffort;
pub use client::Client;
pub use composer::{OutgoingContent, Sent};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::ClientEvent;
pub use fanout::{IndexFanout, PerParticipantFanout};
pub use groups::GroupBuilder;
pub use index::ConversationSummary;
pub use selection::{SelectTarget, Selection};
pub use session::Session;
pub use theme::{Theme, ThemeContext};

/// Install the global `tracing` subscriber.  `RUST_LOG` overrides the
/// default filter.  Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tertulia_client=debug,tertulia_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
