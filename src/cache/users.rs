// SPDX-License-Identifier: MPL-2.0

use crate::backend::Direction;
use crate::cache::{CacheDb, CacheError, LocalTable, optional};
use crate::models::User;
use rusqlite::params;

/// Cache operations for user profiles
#[derive(Clone)]
pub struct UserCache {
    db: CacheDb,
}

impl UserCache {
    pub fn new(db: CacheDb) -> Self {
        Self { db }
    }

    fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            photo_url: row.get(3)?,
            email: row.get(4)?,
            credential: row.get(5)?,
        })
    }
}

impl LocalTable<User> for UserCache {
    fn get(&self, id: &str) -> Result<Option<User>, CacheError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, phone, photo_url, email, credential FROM users WHERE id = ?",
        )?;
        optional(stmt.query_row([id], Self::row_to_user))
    }

    fn get_all(&self, direction: Direction) -> Result<Vec<User>, CacheError> {
        let conn = self.db.conn();
        let dir = direction.as_sql();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, phone, photo_url, email, credential FROM users
             ORDER BY name {dir}, id ASC"
        ))?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Lookup by email
    fn get_by_secondary_key(&self, email: &str) -> Result<Vec<User>, CacheError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, phone, photo_url, email, credential FROM users
             WHERE email = ? COLLATE NOCASE",
        )?;

        let users = stmt
            .query_map([email], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn upsert(&self, user: &User) -> Result<(), CacheError> {
        let conn = self.db.conn();
        conn.execute(
            r#"
            INSERT INTO users (id, name, phone, photo_url, email, credential)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                phone = excluded.phone,
                photo_url = excluded.photo_url,
                email = excluded.email,
                credential = excluded.credential
            "#,
            params![
                user.id,
                user.name,
                user.phone,
                user.photo_url,
                user.email,
                user.credential,
            ],
        )?;
        Ok(())
    }

    fn update(&self, user: &User) -> Result<bool, CacheError> {
        let conn = self.db.conn();
        let changed = conn.execute(
            r#"
            UPDATE users SET name = ?2, phone = ?3, photo_url = ?4, email = ?5, credential = ?6
            WHERE id = ?1
            "#,
            params![
                user.id,
                user.name,
                user.phone,
                user.photo_url,
                user.email,
                user.credential,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: &str) -> Result<bool, CacheError> {
        let conn = self.db.conn();
        let changed = conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(changed > 0)
    }
}
