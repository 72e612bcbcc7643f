// SPDX-License-Identifier: MPL-2.0

use crate::backend::types::{Document, DocumentChange, OrderBy};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("subscription closed")]
    Closed,
}

/// What a subscription delivers.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// An ordered batch of change-events, as produced by the server.
    Changes(Vec<DocumentChange>),
    /// The subscription failed; nothing follows on this handle.
    Error(FeedError),
}

/// Cancellable handle over a live change subscription.
///
/// Dropping the handle unregisters the listener with the feed.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<FeedEvent>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        events: mpsc::UnboundedReceiver<FeedEvent>,
        on_cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Next event, or `None` once the feed closed the channel.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        self.events.recv().await
    }

    /// Unregister the listener now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Hosted, realtime-subscribable document collections.
#[async_trait]
pub trait DocumentFeed: Send + Sync {
    /// Point read.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FeedError>;

    /// Full replace (creates the document if absent).
    async fn set(&self, collection: &str, id: &str, body: Document) -> Result<(), FeedError>;

    /// Merge top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), FeedError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), FeedError>;

    /// Subscribe to changes of a collection ordered by `order`.
    /// The first batch is the current snapshot as `Added` events.
    async fn subscribe(&self, collection: &str, order: OrderBy)
    -> Result<Subscription, FeedError>;
}
