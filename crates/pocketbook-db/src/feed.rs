use crate::models::{CommentRow, PostRow};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::{Row, TransactionBehavior};

/// `?1` is always the viewing user, used for `liked_by_me`.
const POST_SELECT: &str = "
    SELECT p.id, p.author_id, u.username, p.title, p.content, p.image_url, p.like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
           EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?1),
           p.created_at
    FROM posts p
    LEFT JOIN users u ON p.author_id = u.id";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
    FROM comments c
    LEFT JOIN users u ON c.author_id = u.id";

impl Database {
    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        title: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, title, content, image_url) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, author_id, title, content, image_url),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str, viewer_id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE p.id = ?2", POST_SELECT);
            conn.query_row(&sql, (viewer_id, id), post_from_row).optional()
        })
    }

    /// Newest first. `before` is a `created_at` cursor from a previous page.
    pub fn list_posts(&self, viewer_id: &str, limit: u32, before: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE (?2 IS NULL OR p.created_at < ?2)
                 ORDER BY p.created_at DESC, p.rowid DESC
                 LIMIT ?3",
                POST_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((viewer_id, before, limit), post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_post_author(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT author_id FROM posts WHERE id = ?1", [id], |row| row.get(0))
                .optional()
        })
    }

    /// Deletes a post; likes and comments go with it.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Likes --

    /// Toggle a like: removes if it exists, inserts if not, and keeps the
    /// post's `like_count` in step inside the same transaction.
    /// Returns `None` when the post does not exist, otherwise `(liked, like_count)`.
    pub fn toggle_like(&self, id: &str, post_id: &str, user_id: &str) -> Result<Option<(bool, i64)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists: Option<i64> = tx
                .query_row("SELECT 1 FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(None);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    (post_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            let liked = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                tx.execute(
                    "UPDATE posts SET like_count = MAX(like_count - 1, 0) WHERE id = ?1",
                    [post_id],
                )?;
                false
            } else {
                tx.execute(
                    "INSERT INTO likes (id, post_id, user_id) VALUES (?1, ?2, ?3)",
                    (id, post_id, user_id),
                )?;
                tx.execute("UPDATE posts SET like_count = like_count + 1 WHERE id = ?1", [post_id])?;
                true
            };

            let like_count: i64 =
                tx.query_row("SELECT like_count FROM posts WHERE id = ?1", [post_id], |row| row.get(0))?;
            tx.commit()?;

            Ok(Some((liked, like_count)))
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, post_id: &str, author_id: &str, content: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, content) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, author_id, content),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            conn.query_row(&sql, [id], comment_from_row).optional()
        })
    }

    /// Oldest first.
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.post_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "unknown".to_string()),
        title: row.get(3)?,
        content: row.get(4)?,
        image_url: row.get(5)?,
        like_count: row.get(6)?,
        comment_count: row.get(7)?,
        liked_by_me: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get::<_, Option<String>>(3)?.unwrap_or_else(|| "unknown".to_string()),
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
