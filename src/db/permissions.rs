//! Upload allow-list: only emails listed here may be named as uploader.

use anyhow::Result;
use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::Serialize;

use super::Database;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPermission {
    pub id: i64,
    pub email: String,
    pub created_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionInsert {
    Added(i64),
    AlreadyPresent,
}

impl Database {
    /// Add a normalised email to the allow-list.
    pub fn add_upload_permission(&self, email: &str, created_by: &str) -> Result<PermissionInsert> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO upload_permissions (email, created_by) VALUES (?, ?)",
            params![email, created_by],
        );
        match result {
            Ok(_) => Ok(PermissionInsert::Added(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(PermissionInsert::AlreadyPresent)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an entry by id. Unknown ids are not an error.
    pub fn remove_upload_permission(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM upload_permissions WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    pub fn is_upload_email_allowed(&self, email: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT id FROM upload_permissions WHERE email = ?",
                [email],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_upload_permissions(&self) -> Result<Vec<UploadPermission>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, created_by, created_at FROM upload_permissions
             ORDER BY created_at DESC, id DESC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(UploadPermission {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    created_by: row.get(2)?,
                    created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
