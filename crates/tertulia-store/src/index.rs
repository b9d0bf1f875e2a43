//! Per-user conversation index documents.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use tertulia_shared::{ConversationId, ConversationIndex, IndexEntry, UserId};

use crate::database::{encode_ts, json_column, Database};
use crate::error::{Result, StoreError};

impl Database {
    pub fn index_exists(&self, uid: &UserId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM user_index WHERE uid = ?1",
                params![uid.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create_index(&self, uid: &UserId) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO user_index (uid, created_at) VALUES (?1, ?2)",
            params![uid.as_str(), encode_ts(&Utc::now())],
        )?;
        Ok(())
    }

    pub fn get_index(&self, uid: &UserId) -> Result<Option<ConversationIndex>> {
        if !self.index_exists(uid)? {
            return Ok(None);
        }

        let mut stmt = self
            .conn()
            .prepare("SELECT conversation_id, doc FROM index_entries WHERE uid = ?1")?;

        let rows = stmt.query_map(params![uid.as_str()], |row| {
            let conversation: String = row.get(0)?;
            let raw: String = row.get(1)?;
            let entry: IndexEntry = json_column(1, &raw)?;
            Ok((ConversationId::new(conversation), entry))
        })?;

        let mut index = ConversationIndex::default();
        for row in rows {
            let (conversation, entry) = row?;
            index.0.insert(conversation, entry);
        }
        Ok(Some(index))
    }

    /// Merge one entry.  With `create_missing` unset a missing index
    /// document is reported as [`StoreError::NotFound`].
    pub fn merge_index_entry(
        &mut self,
        uid: &UserId,
        conversation: &ConversationId,
        patch: IndexEntry,
        create_missing: bool,
    ) -> Result<()> {
        if create_missing {
            self.create_index(uid)?;
        } else if !self.index_exists(uid)? {
            return Err(StoreError::not_found("userChats", uid));
        }

        let tx = self.conn_mut().transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT doc FROM index_entries WHERE uid = ?1 AND conversation_id = ?2",
                params![uid.as_str(), conversation.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let mut entry = match existing {
            Some(raw) => serde_json::from_str::<IndexEntry>(&raw)?,
            None => IndexEntry::default(),
        };
        entry.merge(patch);

        tx.execute(
            "INSERT INTO index_entries (uid, conversation_id, doc) VALUES (?1, ?2, ?3)
             ON CONFLICT(uid, conversation_id) DO UPDATE SET doc = excluded.doc",
            params![uid.as_str(), conversation.as_str(), serde_json::to_string(&entry)?],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tertulia_shared::{LastMessage, PeerInfo};

    #[test]
    fn missing_index_reads_as_none_until_created() {
        let db = Database::open_in_memory().unwrap();
        let uid = UserId::new("a1");
        assert!(db.get_index(&uid).unwrap().is_none());
        db.create_index(&uid).unwrap();
        assert!(db.get_index(&uid).unwrap().unwrap().is_empty());
    }

    #[test]
    fn merge_preserves_other_fields_and_entries() {
        let mut db = Database::open_in_memory().unwrap();
        let uid = UserId::new("a1");
        let conv = ConversationId::new("a1b2");
        let other = ConversationId::new("a1c3");
        let now = Utc::now();

        let err = db
            .merge_index_entry(&uid, &conv, IndexEntry::default(), false)
            .unwrap_err();
        assert!(err.is_not_found());

        let peer = PeerInfo::user(&UserId::new("b2"), "Beto", "");
        db.merge_index_entry(&uid, &conv, IndexEntry::with_peer(peer, now), true)
            .unwrap();
        db.merge_index_entry(
            &uid,
            &other,
            IndexEntry::with_peer(PeerInfo::user(&UserId::new("c3"), "Cata", ""), now),
            false,
        )
        .unwrap();
        db.merge_index_entry(
            &uid,
            &conv,
            IndexEntry::with_last_message(LastMessage { text: "hola".into() }, now),
            false,
        )
        .unwrap();

        let index = db.get_index(&uid).unwrap().unwrap();
        assert_eq!(index.len(), 2);
        let entry = index.get(&conv).unwrap();
        assert_eq!(entry.user_info.as_ref().unwrap().display_name, "Beto");
        assert_eq!(entry.last_message.as_ref().unwrap().text, "hola");
    }
}
