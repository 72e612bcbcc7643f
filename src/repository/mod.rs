// SPDX-License-Identifier: MPL-2.0

//! Per-kind façades over the feed, object storage and the local cache.
//!
//! Mutations go to the remote services only; the local cache changes when the
//! resulting change-events come back through the kind's reconciler. Reads are
//! answered from the local cache.

mod comments;
mod posts;
mod users;

pub use comments::{CommentRepository, NewComment};
pub use posts::{NewPost, PostRepository};
pub use users::{SignUp, UserRepository};

use crate::backend::{AuthError, FeedError, ObjectStore, StorageError};
use crate::cache::CacheError;
use crate::sync::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("media upload failed: {0}")]
    Upload(#[source] StorageError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RepoError {
    /// Text for a short notification shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            RepoError::Invalid(message) => (*message).to_string(),
            RepoError::NotFound { .. } | RepoError::Feed(FeedError::NotFound { .. }) => {
                "This item no longer exists.".to_string()
            }
            RepoError::Upload(_) => "Could not upload the image. Please try again.".to_string(),
            RepoError::Feed(FeedError::PermissionDenied(_)) => {
                "You are not allowed to do that.".to_string()
            }
            RepoError::Feed(_) | RepoError::Sync(_) => {
                "Could not reach the server. Please try again.".to_string()
            }
            RepoError::Auth(e) => e.to_string(),
            RepoError::Cache(_) | RepoError::Task(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Object key for the media of entity `id`.
fn media_key(folder: &str, id: &str) -> String {
    format!("{folder}/{id}")
}

/// Remove media that is no longer referenced. Failure only costs storage.
async fn discard_media(storage: &dyn ObjectStore, url: &str) {
    match storage.delete(url).await {
        Ok(()) => tracing::debug!(url, "media deleted"),
        Err(e) => tracing::warn!(url, error = %e, "could not delete media"),
    }
}
