//! SQLite store for images, likes, comments, admins and the upload allow-list.
//!
//! Connections come from an r2d2 pool. Every mutating operation opens its own
//! transaction on a pooled connection, so callers never see half-applied
//! writes. All methods block; async callers run them on the blocking pool.

mod schema;
pub mod admins;
pub mod comments;
pub mod images;
pub mod likes;
pub mod permissions;
pub mod stats;

use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

pub use schema::{MIGRATIONS, SCHEMA};
pub use admins::Admin;
pub use comments::{Comment, COMMENT_PAGE_SIZE};
pub use images::{Image, ImageSort, NewImage};
pub use likes::LikeOutcome;
pub use permissions::{PermissionInsert, UploadPermission};
pub use stats::{DailyUploads, DashboardStats, TopImage};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection setup: WAL journal, enforced foreign keys, and a busy
/// timeout so writers queue on the lock instead of failing immediately.
fn prepare_connection(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    conn.pragma_update(None, "foreign_keys", 1)?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) the database file behind a connection pool.
    pub fn open(path: &Path, pool_size: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {:?}", parent))?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(prepare_connection);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(Duration::from_secs(10))
            .build(manager)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        Ok(Self { pool })
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA).context("Failed to create schema")?;
        for migration in MIGRATIONS {
            if let Err(e) = conn.execute(migration, []) {
                tracing::debug!("Skipping migration {:?}: {}", migration, e);
            }
        }
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<DbConn> {
        self.pool
            .get()
            .context("Failed to check out a database connection")
    }
}
