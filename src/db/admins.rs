use anyhow::Result;
use rusqlite::{params, ErrorCode, OptionalExtension};

use super::Database;
use crate::auth;

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub created_at: String,
}

/// Accounts created on every start if missing. Not editable through the API.
pub const SEED_ADMINS: &[(&str, &str, &str)] = &[
    ("admin1", "123456", "admin1@gmail.com"),
    ("admin2", "123456", "admin2@gmail.com"),
];

impl Database {
    pub fn find_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let conn = self.conn()?;
        let admin = conn
            .query_row(
                "SELECT id, username, password, email, created_at FROM admins WHERE username = ?",
                [username],
                |row| {
                    Ok(Admin {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                        email: row.get(3)?,
                        created_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(admin)
    }

    /// Insert the fixed admin accounts. Existing usernames are left untouched,
    /// including their password hash, so repeated starts are harmless.
    pub fn seed_admins(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut created = 0;
        for (username, password, email) in SEED_ADMINS {
            let exists = conn
                .query_row("SELECT 1 FROM admins WHERE username = ?", [username], |_| Ok(()))
                .optional()?
                .is_some();
            if exists {
                continue;
            }
            let hash = auth::hash_password(password)?;
            match conn.execute(
                "INSERT INTO admins (username, password, email) VALUES (?, ?, ?)",
                params![username, hash, email],
            ) {
                Ok(_) => created += 1,
                // Another process seeded the same account in between.
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(created)
    }
}
