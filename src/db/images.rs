//! Image rows: insert, list, lookup and delete.

use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;

use super::Database;

/// An image as served by `/api/images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: i64,
    pub title: String,
    pub filename: String,
    pub description: Option<String>,
    pub likes: i64,
    pub uploaded_at: String,
}

impl Image {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            filename: row.get(2)?,
            description: row.get(3)?,
            likes: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            uploaded_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        })
    }

    /// Case-insensitive substring match against title or description.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Fields supplied by an upload.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub title: String,
    pub filename: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageSort {
    #[default]
    Recent,
    Likes,
    Oldest,
}

impl ImageSort {
    /// Unknown values fall back to `Recent`.
    pub fn parse(value: &str) -> Self {
        match value {
            "likes" => ImageSort::Likes,
            "oldest" => ImageSort::Oldest,
            _ => ImageSort::Recent,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            ImageSort::Recent => "uploaded_at DESC, id DESC",
            ImageSort::Likes => "likes DESC, id DESC",
            ImageSort::Oldest => "uploaded_at ASC, id ASC",
        }
    }
}

const IMAGE_COLUMNS: &str = "id, title, filename, description, likes, uploaded_at";

impl Database {
    /// Insert an image row and run `persist` (the file write) inside the same
    /// transaction. If `persist` fails the row is rolled back. If the commit
    /// itself fails the caller is responsible for removing the written file.
    pub fn insert_image<F>(&self, image: &NewImage, persist: F) -> Result<Image>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO images (title, filename, description, likes) VALUES (?, ?, ?, 0)",
            params![image.title, image.filename, image.description],
        )?;
        let id = tx.last_insert_rowid();
        let inserted = tx.query_row(
            &format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"),
            [id],
            Image::from_row,
        )?;
        persist()?;
        tx.commit()?;
        Ok(inserted)
    }

    pub fn get_image(&self, id: i64) -> Result<Option<Image>> {
        let conn = self.conn()?;
        let image = conn
            .query_row(
                &format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"),
                [id],
                Image::from_row,
            )
            .optional()?;
        Ok(image)
    }

    /// All images in the requested order, filtered in memory by `search`.
    pub fn list_images(&self, sort: ImageSort, search: Option<&str>) -> Result<Vec<Image>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images ORDER BY {}",
            sort.order_by()
        ))?;
        let images = stmt
            .query_map([], Image::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let needle = search.map(str::trim).unwrap_or("").to_lowercase();
        if needle.is_empty() {
            return Ok(images);
        }
        Ok(images.into_iter().filter(|img| img.matches(&needle)).collect())
    }

    /// Delete an image together with its likes and comments. Returns the
    /// deleted row so the caller can remove the backing file; `None` when the
    /// id is unknown.
    pub fn delete_image(&self, id: i64) -> Result<Option<Image>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let image = tx
            .query_row(
                &format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?"),
                [id],
                Image::from_row,
            )
            .optional()?;
        if image.is_some() {
            tx.execute("DELETE FROM likes WHERE image_id = ?", [id])?;
            tx.execute("DELETE FROM comments WHERE image_id = ?", [id])?;
            tx.execute("DELETE FROM images WHERE id = ?", [id])?;
        }
        tx.commit()?;
        Ok(image)
    }

    /// Every filename referenced by an image row.
    pub fn image_filenames(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT filename FROM images")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}
