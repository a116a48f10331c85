use crate::{Database, OptionalExt};
use crate::models::MessageRow;
use anyhow::Result;
use rusqlite::Row;

const MESSAGE_SELECT: &str = "
    SELECT m.id, m.sender_id, s.username, m.receiver_id, r.username, m.content, m.is_read, m.created_at
    FROM messages m
    LEFT JOIN users s ON m.sender_id = s.id
    LEFT JOIN users r ON m.receiver_id = r.id";

impl Database {
    pub fn insert_message(&self, id: &str, sender_id: &str, receiver_id: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content) VALUES (?1, ?2, ?3, ?4)",
                (id, sender_id, receiver_id, content),
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE m.id = ?1", MESSAGE_SELECT);
            conn.query_row(&sql, [id], message_from_row).optional()
        })
    }

    /// Every message the user sent or received, oldest first.
    pub fn get_messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 ORDER BY m.created_at ASC, m.rowid ASC",
                MESSAGE_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The most recent `limit` messages between two users, returned oldest first.
    pub fn get_conversation(&self, user_id: &str, other_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
                    OR (m.sender_id = ?2 AND m.receiver_id = ?1)
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?3",
                MESSAGE_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map((user_id, other_id, limit), message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    /// Mark everything `sender_id` sent to `receiver_id` as read.
    /// Returns how many messages flipped from unread.
    pub fn mark_conversation_read(&self, receiver_id: &str, sender_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0",
                (receiver_id, sender_id),
            )?;
            Ok(changed)
        })
    }

    pub fn count_unread(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "unknown".to_string()),
        receiver_id: row.get(3)?,
        receiver_username: row.get::<_, Option<String>>(4)?.unwrap_or_else(|| "unknown".to_string()),
        content: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::seed_user;

    #[test]
    fn conversation_is_limited_to_latest_and_ordered() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");

        db.insert_message("m1", &alice, &bob, "hi bob").unwrap();
        db.insert_message("m2", &bob, &alice, "hi alice").unwrap();
        db.insert_message("m3", &carol, &alice, "unrelated").unwrap();
        db.insert_message("m4", &alice, &bob, "how are you").unwrap();

        let convo = db.get_conversation(&alice, &bob, 2).unwrap();
        let ids: Vec<&str> = convo.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m4"]);
        assert_eq!(convo[0].sender_username, "bob");
    }

    #[test]
    fn stored_message_reads_back_with_usernames() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        db.insert_message("m1", &alice, &bob, "hello").unwrap();
        let row = db.get_message("m1").unwrap().unwrap();
        assert_eq!(row.sender_username, "alice");
        assert_eq!(row.receiver_username, "bob");
        assert!(!row.is_read);
        assert!(crate::parse_timestamp(&row.created_at).is_ok());
        assert!(db.get_message("missing").unwrap().is_none());
    }

    #[test]
    fn mark_read_only_touches_one_direction() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        db.insert_message("m1", &bob, &alice, "one").unwrap();
        db.insert_message("m2", &bob, &alice, "two").unwrap();
        db.insert_message("m3", &alice, &bob, "three").unwrap();

        assert_eq!(db.count_unread(&alice).unwrap(), 2);
        assert_eq!(db.mark_conversation_read(&alice, &bob).unwrap(), 2);
        assert_eq!(db.mark_conversation_read(&alice, &bob).unwrap(), 0);
        assert_eq!(db.count_unread(&alice).unwrap(), 0);
        assert_eq!(db.count_unread(&bob).unwrap(), 1);
    }

    #[test]
    fn messages_for_user_include_both_directions() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");

        db.insert_message("m1", &alice, &bob, "a").unwrap();
        db.insert_message("m2", &carol, &alice, "b").unwrap();
        db.insert_message("m3", &bob, &carol, "c").unwrap();

        let rows = db.get_messages_for_user(&alice).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
