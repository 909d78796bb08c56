//! Like toggling.
//!
//! The like count on `images` is a denormalised copy of `COUNT(likes)`. The
//! existence check, the insert/delete and the counter update all run inside a
//! single `BEGIN IMMEDIATE` transaction: the write lock is taken before the
//! first read, so two concurrent toggles on the same database can never both
//! act on a stale view.

use anyhow::Result;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::Serialize;

use super::Database;

/// Result of a toggle, as returned by `/api/like/<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub likes: i64,
    pub liked: bool,
}

impl Database {
    /// Flip the like state of `email` (already normalised) on an image.
    /// Returns `None` if the image does not exist.
    pub fn toggle_like(&self, image_id: i64, email: &str) -> Result<Option<LikeOutcome>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
            .query_row("SELECT id FROM images WHERE id = ?", [image_id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let existing = tx
            .query_row(
                "SELECT id FROM likes WHERE image_id = ? AND email = ?",
                params![image_id, email],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        let liked = match existing {
            Some(like_id) => {
                tx.execute("DELETE FROM likes WHERE id = ?", [like_id])?;
                tx.execute(
                    "UPDATE images SET likes = CASE WHEN likes > 0 THEN likes - 1 ELSE 0 END
                     WHERE id = ?",
                    [image_id],
                )?;
                false
            }
            None => {
                tx.execute(
                    "INSERT INTO likes (image_id, email) VALUES (?, ?)",
                    params![image_id, email],
                )?;
                tx.execute(
                    "UPDATE images SET likes = COALESCE(likes, 0) + 1 WHERE id = ?",
                    [image_id],
                )?;
                true
            }
        };

        let likes: i64 = tx.query_row(
            "SELECT COALESCE(likes, 0) FROM images WHERE id = ?",
            [image_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(Some(LikeOutcome { likes, liked }))
    }

    /// Number of like rows for an image, independent of the counter.
    pub fn count_like_rows(&self, image_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE image_id = ?",
            [image_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add_image, temp_db};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_toggle_twice_restores_state() {
        let (_dir, db) = temp_db();
        let id = add_image(&db, "Sunset", None);

        let first = db.toggle_like(id, "a@b.com").unwrap().unwrap();
        assert_eq!(first, LikeOutcome { likes: 1, liked: true });

        let second = db.toggle_like(id, "a@b.com").unwrap().unwrap();
        assert_eq!(second, LikeOutcome { likes: 0, liked: false });
        assert_eq!(db.count_like_rows(id).unwrap(), 0);
    }

    #[test]
    fn test_unknown_image_returns_none() {
        let (_dir, db) = temp_db();
        assert!(db.toggle_like(42, "a@b.com").unwrap().is_none());
    }

    #[test]
    fn test_counter_matches_rows_after_mixed_sequence() {
        let (_dir, db) = temp_db();
        let id = add_image(&db, "Dunes", None);
        let emails = ["a@b.com", "c@d.org", "e@f.net", "a@b.com", "g@h.io", "c@d.org", "a@b.com"];
        for email in emails {
            db.toggle_like(id, email).unwrap();
            let image = db.get_image(id).unwrap().unwrap();
            assert_eq!(image.likes, db.count_like_rows(id).unwrap());
        }
        // a@b.com liked 3 times (on), c@d.org twice (off), e and g once (on)
        assert_eq!(db.get_image(id).unwrap().unwrap().likes, 3);
    }

    #[test]
    fn test_counter_never_goes_negative() {
        let (_dir, db) = temp_db();
        let id = add_image(&db, "Drift", None);
        db.toggle_like(id, "a@b.com").unwrap();
        // Simulate a drifted counter from an older build.
        db.conn()
            .unwrap()
            .execute("UPDATE images SET likes = 0 WHERE id = ?", [id])
            .unwrap();
        let outcome = db.toggle_like(id, "a@b.com").unwrap().unwrap();
        assert_eq!(outcome, LikeOutcome { likes: 0, liked: false });
    }

    #[test]
    fn test_concurrent_toggles_keep_counter_consistent() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let id = add_image(&db, "Crowd", None);

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for n in 0..10 {
                        let email = format!("user{worker}-{n}@example.com");
                        db.toggle_like(id, &email).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let image = db.get_image(id).unwrap().unwrap();
        assert_eq!(image.likes, 40);
        assert_eq!(db.count_like_rows(id).unwrap(), 40);
    }

    #[test]
    fn test_comments_and_deletes_wait_for_concurrent_toggles() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let id = add_image(&db, "Busy", None);
        let doomed: Vec<i64> = (0..20)
            .map(|n| add_image(&db, &format!("Doomed{n}"), None))
            .collect();

        let mut handles = Vec::new();
        for worker in 0..2 {
            let db = Arc::clone(&db);
            handles.push(thread::spawn(move || {
                for n in 0..100 {
                    let email = format!("fan{worker}-{}@example.com", n % 7);
                    db.toggle_like(id, &email).unwrap();
                }
            }));
        }
        for worker in 0..2 {
            let db = Arc::clone(&db);
            handles.push(thread::spawn(move || {
                for n in 0..100 {
                    let text = format!("comment {worker}-{n}");
                    assert!(db.add_comment(id, "a@b.com", &text).unwrap().is_some());
                }
            }));
        }
        {
            let db = Arc::clone(&db);
            handles.push(thread::spawn(move || {
                for doomed_id in doomed {
                    assert!(db.delete_image(doomed_id).unwrap().is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let comments: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM comments WHERE image_id = ?", [id], |row| row.get(0))
            .unwrap();
        assert_eq!(comments, 200);
        assert_eq!(db.get_image(id).unwrap().unwrap().likes, db.count_like_rows(id).unwrap());
        assert_eq!(db.image_filenames().unwrap(), vec!["busy.jpg".to_string()]);
    }
}
