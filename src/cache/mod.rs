// SPDX-License-Identifier: MPL-2.0

mod comments;
mod db;
mod posts;
mod schema;
mod users;

pub use comments::CommentCache;
pub use db::CacheDb;
pub use posts::PostCache;
pub use users::UserCache;

use crate::backend::Direction;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database path error: {0}")]
    Path(String),
}

/// One local table per entity kind. All calls block; run them off the async
/// workers (`spawn_blocking`).
pub trait LocalTable<E>: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<E>, CacheError>;

    /// Every row, ordered by the kind's order field.
    fn get_all(&self, direction: Direction) -> Result<Vec<E>, CacheError>;

    /// Rows matching the kind's secondary key (post author, comment post, user email).
    fn get_by_secondary_key(&self, key: &str) -> Result<Vec<E>, CacheError>;

    /// Insert or replace by id.
    fn upsert(&self, row: &E) -> Result<(), CacheError>;

    /// Overwrite an existing row; returns false when absent.
    fn update(&self, row: &E) -> Result<bool, CacheError>;

    /// Returns false when absent.
    fn delete(&self, id: &str) -> Result<bool, CacheError>;
}

/// Map "no rows" to `None` for point reads.
fn optional<T>(result: Result<T, rusqlite::Error>) -> Result<Option<T>, CacheError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(other) => Err(CacheError::Database(other)),
    }
}

fn parse_cached_timestamp(
    value: &str,
) -> Result<chrono::DateTime<chrono::Utc>, rusqlite::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&chrono::Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
