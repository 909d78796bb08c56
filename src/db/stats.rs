//! Aggregates shown on the admin dashboard.

use anyhow::Result;
use serde::Serialize;

use super::Database;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopImage {
    pub title: String,
    pub likes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyUploads {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub total_images: i64,
    pub total_likes: i64,
    /// Best five by likes.
    pub top_images: Vec<TopImage>,
    /// Upload counts for the latest ten days that had uploads.
    pub upload_stats: Vec<DailyUploads>,
}

impl Database {
    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        let conn = self.conn()?;

        let total_images: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |r| r.get(0))?;
        let total_likes: i64 =
            conn.query_row("SELECT COALESCE(SUM(likes), 0) FROM images", [], |r| r.get(0))?;

        let mut stmt =
            conn.prepare("SELECT title, likes FROM images ORDER BY likes DESC, id DESC LIMIT 5")?;
        let top_images = stmt
            .query_map([], |row| {
                Ok(TopImage {
                    title: row.get(0)?,
                    likes: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT DATE(uploaded_at) AS date, COUNT(*) AS count
            FROM images
            GROUP BY DATE(uploaded_at)
            ORDER BY date DESC
            LIMIT 10
            "#,
        )?;
        let upload_stats = stmt
            .query_map([], |row| {
                Ok(DailyUploads {
                    date: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DashboardStats {
            total_images,
            total_likes,
            top_images,
            upload_stats,
        })
    }
}
