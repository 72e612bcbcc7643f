// SPDX-License-Identifier: MPL-2.0

use crate::backend::Direction;
use crate::cache::{CacheDb, CacheError, LocalTable, optional, parse_cached_timestamp};
use crate::models::{Comment, format_timestamp};
use rusqlite::params;

/// Cache operations for comments
#[derive(Clone)]
pub struct CommentCache {
    db: CacheDb,
}

impl CommentCache {
    pub fn new(db: CacheDb) -> Self {
        Self { db }
    }

    fn row_to_comment(row: &rusqlite::Row) -> Result<Comment, rusqlite::Error> {
        let created_at: String = row.get(4)?;
        Ok(Comment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            author_id: row.get(2)?,
            text: row.get(3)?,
            created_at: parse_cached_timestamp(&created_at)?,
        })
    }
}

impl LocalTable<Comment> for CommentCache {
    fn get(&self, id: &str) -> Result<Option<Comment>, CacheError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, post_id, author_id, text, created_at FROM comments WHERE id = ?",
        )?;
        optional(stmt.query_row([id], Self::row_to_comment))
    }

    fn get_all(&self, direction: Direction) -> Result<Vec<Comment>, CacheError> {
        let conn = self.db.conn();
        let dir = direction.as_sql();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, post_id, author_id, text, created_at FROM comments
             ORDER BY created_at {dir}, id ASC"
        ))?;

        let comments = stmt
            .query_map([], Self::row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    /// Comments on a post, newest first
    fn get_by_secondary_key(&self, post_id: &str) -> Result<Vec<Comment>, CacheError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, post_id, author_id, text, created_at FROM comments
            WHERE post_id = ?
            ORDER BY created_at DESC, id ASC
            "#,
        )?;

        let comments = stmt
            .query_map([post_id], Self::row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn upsert(&self, comment: &Comment) -> Result<(), CacheError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO comments (id, post_id, author_id, text, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                post_id = excluded.post_id,
                author_id = excluded.author_id,
                text = excluded.text,
                created_at = excluded.created_at
            "#,
            params![
                comment.id,
                comment.post_id,
                comment.author_id,
                comment.text,
                format_timestamp(&comment.created_at),
            ],
        )?;
        Ok(())
    }

    fn update(&self, comment: &Comment) -> Result<bool, CacheError> {
        let conn = self.db.conn();
        let changed = conn.execute(
            r#"
            UPDATE comments SET post_id = ?2, author_id = ?3, text = ?4, created_at = ?5
            WHERE id = ?1
            "#,
            params![
                comment.id,
                comment.post_id,
                comment.author_id,
                comment.text,
                format_timestamp(&comment.created_at),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: &str) -> Result<bool, CacheError> {
        let conn = self.db.conn();
        let changed = conn.execute("DELETE FROM comments WHERE id = ?", [id])?;
        Ok(changed > 0)
    }
}
