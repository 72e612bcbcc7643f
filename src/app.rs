// SPDX-License-Identifier: MPL-2.0

use crate::backend::{AuthProvider, DocumentFeed, HttpObjectStore, ObjectStore, StorageError};
use crate::cache::{CacheDb, CommentCache, PostCache, UserCache};
use crate::media::{MediaBlob, MediaError, prepare_image};
use crate::repository::{CommentRepository, PostRepository, RepoError, UserRepository};
use crate::state::{AppSettings, StorageSettings};
use std::sync::Arc;

/// Handles to the hosted services.
#[derive(Clone)]
pub struct Backend {
    pub feed: Arc<dyn DocumentFeed>,
    pub storage: Arc<dyn ObjectStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Backend {
    /// Media goes to the HTTP object store configured in `storage`.
    pub fn with_http_storage(
        feed: Arc<dyn DocumentFeed>,
        auth: Arc<dyn AuthProvider>,
        storage: &StorageSettings,
    ) -> Result<Self, StorageError> {
        let store = HttpObjectStore::new(&storage.base_url)?;
        tracing::debug!(base_url = %storage.base_url, "using http object storage");
        Ok(Self {
            feed,
            storage: Arc::new(store),
            auth,
        })
    }
}

/// Everything a front end needs: one repository per entity kind, sharing a
/// single local cache.
pub struct HelpHero {
    pub posts: PostRepository,
    pub comments: CommentRepository,
    pub users: UserRepository,
    db: CacheDb,
    settings: AppSettings,
}

impl HelpHero {
    pub fn new(backend: Backend, db: CacheDb, settings: AppSettings) -> Self {
        let retry = settings.sync.retry.clone();

        let posts = PostRepository::new(
            backend.feed.clone(),
            backend.storage.clone(),
            Arc::new(PostCache::new(db.clone())),
            retry.clone(),
        );
        let comments = CommentRepository::new(
            backend.feed.clone(),
            Arc::new(CommentCache::new(db.clone())),
            retry.clone(),
        );
        let users = UserRepository::new(
            backend.feed,
            backend.storage,
            backend.auth,
            Arc::new(UserCache::new(db.clone())),
            retry,
        );

        Self {
            posts,
            comments,
            users,
            db,
            settings,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Start syncing every kind. Stops at the first kind that cannot subscribe;
    /// the ones already started keep running.
    pub async fn start_sync(&self) -> Result<(), RepoError> {
        self.users.start().await?;
        self.posts.start().await?;
        self.comments.start().await?;
        Ok(())
    }

    pub async fn stop_sync(&self) {
        self.comments.stop().await;
        self.posts.stop().await;
        self.users.stop().await;
    }

    /// Stop syncing, end the session and forget the cached data.
    pub async fn sign_out(&self) -> Result<(), RepoError> {
        self.stop_sync().await;
        self.users.sign_out().await?;

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.clear()).await??;
        tracing::info!("local cache cleared");
        Ok(())
    }

    /// Shrink and re-encode a picked image per the media settings.
    pub fn prepare_image(&self, bytes: &[u8]) -> Result<MediaBlob, MediaError> {
        prepare_image(bytes, &self.settings.media)
    }
}
