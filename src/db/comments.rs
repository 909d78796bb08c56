use anyhow::Result;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use super::Database;

/// Most comments ever returned for one image.
pub const COMMENT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub email: String,
    pub text: String,
    pub created_at: String,
}

impl Database {
    /// Append a comment. Text and email must already be validated.
    /// Returns `None` when the image does not exist; nothing is written then.
    pub fn add_comment(&self, image_id: i64, email: &str, text: &str) -> Result<Option<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists = tx
            .query_row("SELECT 1 FROM images WHERE id = ?", [image_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO comments (image_id, email, text) VALUES (?, ?, ?)",
            params![image_id, email, text],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
    }

    /// Latest comments for an image, newest first.
    pub fn recent_comments(&self, image_id: i64) -> Result<Vec<Comment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT email, text, created_at
            FROM comments
            WHERE image_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let comments = stmt
            .query_map(params![image_id, COMMENT_PAGE_SIZE], |row| {
                Ok(Comment {
                    email: row.get(0)?,
                    text: row.get(1)?,
                    created_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }
}
