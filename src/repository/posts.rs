// SPDX-License-Identifier: MPL-2.0

use crate::backend::{DocumentFeed, ObjectStore};
use crate::cache::LocalTable;
use crate::config::POST_IMAGES_FOLDER;
use crate::media::MediaBlob;
use crate::models::{Entity, IMAGE_URL_FIELD, Post, PostPatch, now};
use crate::repository::{RepoError, discard_media, media_key};
use crate::state::RetryPolicy;
use crate::sync::{SyncReconciler, SyncState};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Input for a new post.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub author_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
}

fn check_title(title: &str) -> Result<(), RepoError> {
    if title.trim().is_empty() {
        return Err(RepoError::Invalid("Please enter a title"));
    }
    Ok(())
}

pub struct PostRepository {
    feed: Arc<dyn DocumentFeed>,
    storage: Arc<dyn ObjectStore>,
    table: Arc<dyn LocalTable<Post>>,
    sync: SyncReconciler<Post>,
}

impl PostRepository {
    pub fn new(
        feed: Arc<dyn DocumentFeed>,
        storage: Arc<dyn ObjectStore>,
        table: Arc<dyn LocalTable<Post>>,
        retry: RetryPolicy,
    ) -> Self {
        let sync = SyncReconciler::new(feed.clone(), table.clone(), retry);
        Self {
            feed,
            storage,
            table,
            sync,
        }
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

    /// All cached posts, newest first, republished after every synced batch.
    pub fn posts(&self) -> watch::Receiver<Vec<Post>> {
        self.sync.watch()
    }

    pub fn get_local(&self, id: &str) -> Result<Option<Post>, RepoError> {
        Ok(self.table.get(id)?)
    }

    /// Cached posts by one author, newest first.
    pub fn user_posts(&self, author_id: &str) -> Result<Vec<Post>, RepoError> {
        Ok(self.table.get_by_secondary_key(author_id)?)
    }

    /// Publish a new post. The image is uploaded first; the document is only
    /// written once the upload succeeded.
    pub async fn create(&self, new: NewPost, image: Option<MediaBlob>) -> Result<Post, RepoError> {
        check_title(&new.title)?;

        let id = uuid::Uuid::now_v7().simple().to_string();
        let image_url = match image {
            Some(blob) => Some(
                self.storage
                    .upload(&media_key(POST_IMAGES_FOLDER, &id), blob)
                    .await
                    .map_err(RepoError::Upload)?,
            ),
            None => None,
        };

        let post = Post {
            id,
            author_id: new.author_id,
            title: new.title,
            description: new.description,
            image_url,
            created_at: now(),
            location: new.location,
            comments: Vec::new(),
        };

        if let Err(e) = self
            .feed
            .set(Post::COLLECTION, &post.id, post.to_document())
            .await
        {
            if let Some(url) = &post.image_url {
                discard_media(self.storage.as_ref(), url).await;
            }
            return Err(e.into());
        }

        tracing::info!(id = %post.id, "post created");
        Ok(post)
    }

    /// Edit a post. A new image replaces the old one: the old object is
    /// deleted (best effort), the new one uploaded, and its URL patched in.
    pub async fn update(
        &self,
        id: &str,
        patch: PostPatch,
        image: Option<MediaBlob>,
    ) -> Result<(), RepoError> {
        if let Some(title) = &patch.title {
            check_title(title)?;
        }
        if patch.is_empty() && image.is_none() {
            return Ok(());
        }

        let mut fields = patch.to_document();
        if let Some(blob) = image {
            if let Some(old) = self.image_url(id).await? {
                discard_media(self.storage.as_ref(), &old).await;
            }
            let url = self
                .storage
                .upload(&media_key(POST_IMAGES_FOLDER, id), blob)
                .await
                .map_err(RepoError::Upload)?;
            fields.insert(IMAGE_URL_FIELD.to_string(), Value::String(url));
        }

        self.feed.update(Post::COLLECTION, id, fields).await?;
        tracing::info!(id, "post updated");
        Ok(())
    }

    /// Delete a post and (best effort) its image.
    pub async fn delete(&self, id: &str) -> Result<(), RepoError> {
        match self.image_url(id).await {
            Ok(Some(url)) => discard_media(self.storage.as_ref(), &url).await,
            Ok(None) | Err(RepoError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        self.feed.delete(Post::COLLECTION, id).await?;
        tracing::info!(id, "post deleted");
        Ok(())
    }

    /// Current image URL, from the cache or else the remote document.
    async fn image_url(&self, id: &str) -> Result<Option<String>, RepoError> {
        let table = self.table.clone();
        let cached_id = id.to_string();
        if let Some(post) = tokio::task::spawn_blocking(move || table.get(&cached_id)).await?? {
            return Ok(post.image_url);
        }

        let document = self
            .feed
            .get(Post::COLLECTION, id)
            .await?
            .ok_or_else(|| RepoError::NotFound {
                kind: Post::KIND,
                id: id.to_string(),
            })?;
        Ok(document
            .get(IMAGE_URL_FIELD)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string))
    }
}
