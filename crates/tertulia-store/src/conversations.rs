//! Conversations and their message logs.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use tertulia_shared::{ConversationId, Message};

use crate::database::{encode_ts, json_column, Database};
use crate::error::Result;

impl Database {
    pub fn conversation_exists(&self, id: &ConversationId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create_conversation(&self, id: &ConversationId) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO conversations (id, created_at) VALUES (?1, ?2)",
            params![id.as_str(), encode_ts(&Utc::now())],
        )?;
        Ok(())
    }

    /// Insert or replace a message.  A replaced message keeps its position in
    /// the log.
    pub fn put_message(&self, id: &ConversationId, message: &Message) -> Result<()> {
        self.create_conversation(id)?;
        self.conn().execute(
            "INSERT INTO messages (conversation_id, id, date, doc)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(conversation_id, id) DO UPDATE SET
                date = excluded.date,
                doc = excluded.doc",
            params![
                id.as_str(),
                message.id.to_string(),
                encode_ts(&message.date),
                serde_json::to_string(message)?,
            ],
        )?;
        Ok(())
    }

    pub fn get_message(&self, id: &ConversationId, message_id: Uuid) -> Result<Option<Message>> {
        let message = self
            .conn()
            .query_row(
                "SELECT doc FROM messages WHERE conversation_id = ?1 AND id = ?2",
                params![id.as_str(), message_id.to_string()],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    /// Full log ordered by date, insertion order on ties.
    pub fn messages_for_conversation(&self, id: &ConversationId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT doc FROM messages
             WHERE conversation_id = ?1
             ORDER BY date ASC, seq ASC",
        )?;

        let rows = stmt.query_map(params![id.as_str()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let raw: String = row.get(0)?;
    json_column(0, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tertulia_shared::UserId;

    fn message(text: &str, offset_ms: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            text: text.into(),
            sender_id: UserId::new("a1"),
            sender_display_name: "Ana".into(),
            sender_photo_url: String::new(),
            date: Utc::now() + Duration::milliseconds(offset_ms),
            img: None,
            audio: None,
            reply_to: None,
            is_deleted: false,
        }
    }

    #[test]
    fn log_is_date_ordered_and_replace_keeps_identity() {
        let db = Database::open_in_memory().unwrap();
        let conv = ConversationId::new("a1b2");
        assert!(!db.conversation_exists(&conv).unwrap());

        let late = message("late", 50);
        db.put_message(&conv, &late).unwrap();
        db.put_message(&conv, &message("early", 0)).unwrap();
        assert!(db.conversation_exists(&conv).unwrap());

        let mut deleted = late.clone();
        deleted.soft_delete();
        db.put_message(&conv, &deleted).unwrap();

        let log = db.messages_for_conversation(&conv).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].text, "early");
        assert_eq!(log[1].id, late.id);
        assert!(log[1].is_deleted);
        assert_eq!(db.get_message(&conv, late.id).unwrap().unwrap(), deleted);
    }
}
