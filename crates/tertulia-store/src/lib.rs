//! # tertulia-store
//!
//! Backing stores for the Tertulia engine.
//!
//! The engine talks to a document-oriented realtime store through the
//! [`DocumentStore`] trait and to attachment storage through [`BlobStorage`].
//! Two document backends ship with the crate:
//!
//! - [`MemoryStore`]: in-process, used by tests and embedded single-process
//!   setups.  Supports failure injection for partial fan-out scenarios.
//! - [`SqliteStore`]: durable, backed by a `rusqlite::Connection` with
//!   versioned migrations (see [`Database`]).
//!
//! Both deliver live snapshots through [`Subscription`] handles that stop
//! their background task when dropped.

pub mod blob;
pub mod conversations;
pub mod database;
pub mod document;
pub mod index;
pub mod memory;
pub mod migrations;
pub mod settings;
pub mod sqlite;
pub mod subscription;
pub mod users;

mod error;

pub use blob::{BlobStorage, FsBlobStorage, MemoryBlobStorage};
pub use database::Database;
pub use document::{DocumentStore, StoreChange};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use subscription::Subscription;
