//! v001 -- Initial schema creation.
//!
//! One table per document collection.  Documents are stored as JSON in a
//! `doc` column; only the fields that are queried get their own column.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid                TEXT PRIMARY KEY NOT NULL,
    display_name_lower TEXT NOT NULL,           -- prefix search key
    doc                TEXT NOT NULL            -- JSON User document
);

CREATE INDEX IF NOT EXISTS idx_users_name_lower ON users(display_name_lower);

-- ----------------------------------------------------------------
-- Conversations and their message logs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id         TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,  -- tie-break on equal dates
    conversation_id TEXT NOT NULL,
    id              TEXT NOT NULL,                      -- UUID v4
    date            TEXT NOT NULL,                      -- fixed-width RFC-3339
    doc             TEXT NOT NULL,                      -- JSON Message document

    UNIQUE (conversation_id, id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_date
    ON messages(conversation_id, date ASC, seq ASC);

-- ----------------------------------------------------------------
-- Per-user conversation index
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_index (
    uid        TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS index_entries (
    uid             TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    doc             TEXT NOT NULL,              -- JSON IndexEntry

    PRIMARY KEY (uid, conversation_id),
    FOREIGN KEY (uid) REFERENCES user_index(uid) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
