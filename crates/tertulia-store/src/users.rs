//! CRUD operations for [`User`] documents.

use rusqlite::{params, OptionalExtension};

use tertulia_shared::{User, UserId, UserPatch};

use crate::database::{json_column, Database};
use crate::error::{Result, StoreError};

impl Database {
    pub fn get_user(&self, uid: &UserId) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT doc FROM users WHERE uid = ?1",
                params![uid.as_str()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Merge `patch` into the user document.  With `create_missing` unset a
    /// missing document is reported as [`StoreError::NotFound`].
    pub fn merge_user(&mut self, uid: &UserId, patch: UserPatch, create_missing: bool) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let existing: Option<String> = tx
            .query_row("SELECT doc FROM users WHERE uid = ?1", params![uid.as_str()], |row| {
                row.get(0)
            })
            .optional()?;

        let user = match existing {
            Some(raw) => {
                let mut user: User = serde_json::from_str(&raw)?;
                user.apply(patch);
                user
            }
            None if create_missing => User::from_patch(uid.clone(), patch),
            None => return Err(StoreError::not_found("users", uid)),
        };

        tx.execute(
            "INSERT INTO users (uid, display_name_lower, doc) VALUES (?1, ?2, ?3)
             ON CONFLICT(uid) DO UPDATE SET
                display_name_lower = excluded.display_name_lower,
                doc = excluded.doc",
            params![
                uid.as_str(),
                user.display_name_lower,
                serde_json::to_string(&user)?,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Users whose lowercase name lies in `[start, end)`.
    pub fn users_in_name_range(&self, start: &str, end: &str, limit: usize) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT doc FROM users
             WHERE display_name_lower >= ?1 AND display_name_lower < ?2
             ORDER BY display_name_lower ASC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![start, end, limit as i64], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn list_users(&self, limit: usize) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT doc FROM users ORDER BY uid ASC LIMIT ?1")?;

        let rows = stmt.query_map(params![limit as i64], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let raw: String = row.get(0)?;
    json_column(0, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> UserPatch {
        UserPatch {
            display_name: Some(name.into()),
            ..UserPatch::default()
        }
    }

    #[test]
    fn merge_creates_then_updates() {
        let mut db = Database::open_in_memory().unwrap();
        let uid = UserId::new("a1");

        assert!(db.merge_user(&uid, named("Ana"), false).unwrap_err().is_not_found());

        db.merge_user(&uid, named("Ana"), true).unwrap();
        db.merge_user(
            &uid,
            UserPatch {
                bio: Some("hola".into()),
                ..UserPatch::default()
            },
            false,
        )
        .unwrap();

        let user = db.get_user(&uid).unwrap().unwrap();
        assert_eq!(user.display_name, "Ana");
        assert_eq!(user.display_name_lower, "ana");
        assert_eq!(user.bio.as_deref(), Some("hola"));
    }

    #[test]
    fn rename_moves_search_key() {
        let mut db = Database::open_in_memory().unwrap();
        let uid = UserId::new("a1");
        db.merge_user(&uid, named("Ana"), true).unwrap();
        db.merge_user(&uid, named("Zoe"), true).unwrap();

        assert!(db.users_in_name_range("ana", "anb", 5).unwrap().is_empty());
        assert_eq!(db.users_in_name_range("zo", "zp", 5).unwrap().len(), 1);
    }
}
