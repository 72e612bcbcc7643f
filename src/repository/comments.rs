// SPDX-License-Identifier: MPL-2.0

use crate::backend::DocumentFeed;
use crate::cache::LocalTable;
use crate::models::{Comment, CommentPatch, Entity, now};
use crate::repository::RepoError;
use crate::state::RetryPolicy;
use crate::sync::{SyncReconciler, SyncState};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub post_id: String,
    pub author_id: String,
    pub text: String,
}

pub struct CommentRepository {
    feed: Arc<dyn DocumentFeed>,
    table: Arc<dyn LocalTable<Comment>>,
    sync: SyncReconciler<Comment>,
}

impl CommentRepository {
    pub fn new(
        feed: Arc<dyn DocumentFeed>,
        table: Arc<dyn LocalTable<Comment>>,
        retry: RetryPolicy,
    ) -> Self {
        let sync = SyncReconciler::new(feed.clone(), table.clone(), retry);
        Self { feed, table, sync }
    }

    pub async fn start(&self) -> Result<(), RepoError> {
        Ok(self.sync.start().await?)
    }

    pub async fn stop(&self) {
        self.sync.stop().await;
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn comments(&self) -> watch::Receiver<Vec<Comment>> {
        self.sync.watch()
    }

    pub fn get_local(&self, id: &str) -> Result<Option<Comment>, RepoError> {
        Ok(self.table.get(id)?)
    }

    /// Cached comments on a post, newest first.
    pub fn comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, RepoError> {
        Ok(self.table.get_by_secondary_key(post_id)?)
    }

    pub async fn create(&self, new: NewComment) -> Result<Comment, RepoError> {
        if new.text.trim().is_empty() {
            return Err(RepoError::Invalid("Please enter a comment"));
        }

        let comment = Comment {
            id: uuid::Uuid::now_v7().simple().to_string(),
            post_id: new.post_id,
            author_id: new.author_id,
            text: new.text,
            created_at: now(),
        };
        self.feed
            .set(Comment::COLLECTION, &comment.id, comment.to_document())
            .await?;

        tracing::info!(id = %comment.id, post_id = %comment.post_id, "comment created");
        Ok(comment)
    }

    pub async fn update(&self, id: &str, text: &str) -> Result<(), RepoError> {
        if text.trim().is_empty() {
            return Err(RepoError::Invalid("Please enter a comment"));
        }

        let patch = CommentPatch {
            text: Some(text.to_string()),
        };
        self.feed
            .update(Comment::COLLECTION, id, patch.to_document())
            .await?;
        tracing::info!(id, "comment updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), RepoError> {
        self.feed.delete(Comment::COLLECTION, id).await?;
        tracing::info!(id, "comment deleted");
        Ok(())
    }
}
