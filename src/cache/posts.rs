// SPDX-License-Identifier: MPL-2.0

use crate::backend::Direction;
use crate::cache::{CacheDb, CacheError, LocalTable, optional, parse_cached_timestamp};
use crate::models::{CommentSummary, Post, format_timestamp};
use rusqlite::params;

const COLUMNS: &str =
    "id, author_id, title, description, image_url, created_at, location, comments_json";

/// Cache operations for posts
#[derive(Clone)]
pub struct PostCache {
    db: CacheDb,
}

impl PostCache {
    pub fn new(db: CacheDb) -> Self {
        Self { db }
    }

    /// Convert a database row to a Post
    fn row_to_post(row: &rusqlite::Row) -> Result<Post, rusqlite::Error> {
        let created_at: String = row.get(5)?;
        let comments_json: String = row.get(7)?;
        let comments: Vec<CommentSummary> = serde_json::from_str(&comments_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Post {
            id: row.get(0)?,
            author_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            image_url: row.get(4)?,
            created_at: parse_cached_timestamp(&created_at)?,
            location: row.get(6)?,
            comments,
        })
    }

    fn query(&self, sql: &str, param: Option<&str>) -> Result<Vec<Post>, CacheError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(sql)?;
        let mut rows = match param {
            Some(p) => stmt.query([p])?,
            None => stmt.query([])?,
        };

        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(Self::row_to_post(row)?);
        }
        Ok(posts)
    }
}

impl LocalTable<Post> for PostCache {
    fn get(&self, id: &str) -> Result<Option<Post>, CacheError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM posts WHERE id = ?"))?;
        optional(stmt.query_row([id], Self::row_to_post))
    }

    fn get_all(&self, direction: Direction) -> Result<Vec<Post>, CacheError> {
        let dir = direction.as_sql();
        self.query(
            &format!("SELECT {COLUMNS} FROM posts ORDER BY created_at {dir}, id ASC"),
            None,
        )
    }

    /// Posts written by an author, newest first
    fn get_by_secondary_key(&self, author_id: &str) -> Result<Vec<Post>, CacheError> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM posts WHERE author_id = ? ORDER BY created_at DESC, id ASC"
            ),
            Some(author_id),
        )
    }

    fn upsert(&self, post: &Post) -> Result<(), CacheError> {
        let comments_json = serde_json::to_string(&post.comments)?;
        let conn = self.db.conn();

        conn.execute(
            r#"
            INSERT INTO posts (
                id, author_id, title, description, image_url, created_at, location, comments_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                author_id = excluded.author_id,
                title = excluded.title,
                description = excluded.description,
                image_url = excluded.image_url,
                created_at = excluded.created_at,
                location = excluded.location,
                comments_json = excluded.comments_json
            "#,
            params![
                post.id,
                post.author_id,
                post.title,
                post.description,
                post.image_url,
                format_timestamp(&post.created_at),
                post.location,
                comments_json,
            ],
        )?;

        Ok(())
    }

    fn update(&self, post: &Post) -> Result<bool, CacheError> {
        let comments_json = serde_json::to_string(&post.comments)?;
        let conn = self.db.conn();

        let changed = conn.execute(
            r#"
            UPDATE posts
            SET author_id = ?2, title = ?3, description = ?4, image_url = ?5,
                created_at = ?6, location = ?7, comments_json = ?8
            WHERE id = ?1
            "#,
            params![
                post.id,
                post.author_id,
                post.title,
                post.description,
                post.image_url,
                format_timestamp(&post.created_at),
                post.location,
                comments_json,
            ],
        )?;

        Ok(changed > 0)
    }

    fn delete(&self, id: &str) -> Result<bool, CacheError> {
        let conn = self.db.conn();
        let changed = conn.execute("DELETE FROM posts WHERE id = ?", [id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;

    fn post(id: &str, author: &str, created_at: &str) -> Post {
        Post {
            id: id.into(),
            author_id: author.into(),
            title: format!("title {id}"),
            description: String::new(),
            image_url: None,
            created_at: parse_timestamp(id, created_at).unwrap(),
            location: "Haifa".into(),
            comments: vec![CommentSummary {
                comment_id: "c1".into(),
                user_id: "u9".into(),
                text: "hi".into(),
            }],
        }
    }

    fn cache() -> PostCache {
        PostCache::new(CacheDb::open_in_memory().unwrap())
    }

    #[test]
    fn upsert_replaces_by_id() {
        let cache = cache();
        let mut p = post("p1", "u1", "2024-01-01T00:00:00Z");
        cache.upsert(&p).unwrap();

        p.title = "edited".into();
        p.image_url = Some("mem://posts/p1".into());
        cache.upsert(&p).unwrap();

        assert_eq!(cache.get("p1").unwrap(), Some(p));
        assert_eq!(cache.get_all(Direction::Descending).unwrap().len(), 1);
    }

    #[test]
    fn get_missing_is_none() {
        assert_eq!(cache().get("nope").unwrap(), None);
    }

    #[test]
    fn get_all_follows_direction() {
        let cache = cache();
        cache.upsert(&post("old", "u1", "2024-01-01T00:00:00Z")).unwrap();
        cache.upsert(&post("new", "u1", "2024-01-02T00:00:00Z")).unwrap();

        let ids = |dir| -> Vec<String> {
            cache.get_all(dir).unwrap().into_iter().map(|p| p.id).collect()
        };
        assert_eq!(ids(Direction::Descending), vec!["new", "old"]);
        assert_eq!(ids(Direction::Ascending), vec!["old", "new"]);
    }

    #[test]
    fn equal_timestamps_keep_id_order() {
        let cache = cache();
        for id in ["b", "a", "c"] {
            cache.upsert(&post(id, "u1", "2024-01-01T00:00:00Z")).unwrap();
        }

        for dir in [Direction::Descending, Direction::Ascending] {
            let ids: Vec<_> = cache.get_all(dir).unwrap().into_iter().map(|p| p.id).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn posts_by_author() {
        let cache = cache();
        cache.upsert(&post("p1", "u1", "2024-01-01T00:00:00Z")).unwrap();
        cache.upsert(&post("p2", "u2", "2024-01-02T00:00:00Z")).unwrap();
        cache.upsert(&post("p3", "u1", "2024-01-03T00:00:00Z")).unwrap();

        let ids: Vec<_> = cache
            .get_by_secondary_key("u1")
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p3", "p1"]);
    }

    #[test]
    fn update_and_delete_report_presence() {
        let cache = cache();
        let p = post("p1", "u1", "2024-01-01T00:00:00Z");
        assert!(!cache.update(&p).unwrap());
        assert!(!cache.delete("p1").unwrap());

        cache.upsert(&p).unwrap();
        assert!(cache.update(&p).unwrap());
        assert!(cache.delete("p1").unwrap());
        assert_eq!(cache.get("p1").unwrap(), None);
    }
}
