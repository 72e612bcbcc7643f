// SPDX-License-Identifier: MPL-2.0

#![allow(dead_code)]

use helphero::backend::{Document, MemoryAuth, MemoryFeed, MemoryObjectStore};
use helphero::cache::CacheDb;
use helphero::state::{AppSettings, RetryPolicy};
use helphero::{Backend, HelpHero};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const WAIT: Duration = Duration::from_secs(5);

/// Fast retries so tests don't sleep for seconds.
pub const QUICK_RETRY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    initial_backoff_ms: 5,
    max_backoff_ms: 20,
};

pub struct Harness {
    pub feed: MemoryFeed,
    pub storage: MemoryObjectStore,
    pub auth: MemoryAuth,
    pub app: HelpHero,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_db(CacheDb::open_in_memory().unwrap())
    }

    pub fn with_db(db: CacheDb) -> Self {
        Self::with_parts(MemoryFeed::new(), db)
    }

    pub fn with_parts(feed: MemoryFeed, db: CacheDb) -> Self {
        let storage = MemoryObjectStore::new();
        let auth = MemoryAuth::new();
        let backend = Backend {
            feed: Arc::new(feed.clone()),
            storage: Arc::new(storage.clone()),
            auth: Arc::new(auth.clone()),
        };
        let mut settings = AppSettings::default();
        settings.sync.retry = QUICK_RETRY;

        Self {
            feed,
            storage,
            auth,
            app: HelpHero::new(backend, db, settings),
        }
    }
}

/// Wait until the watched value satisfies `f`, failing the test after `WAIT`.
pub async fn wait_for<T: Clone>(rx: &mut watch::Receiver<T>, f: impl FnMut(&T) -> bool) -> T {
    let value = tokio::time::timeout(WAIT, rx.wait_for(f))
        .await
        .expect("timed out waiting for published value")
        .expect("publisher went away");
    value.clone()
}

pub fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().expect("document must be an object")
}

pub fn post_doc(title: &str, created_at: &str) -> Document {
    doc(json!({
        "userId": "u1",
        "title": title,
        "description": format!("about {title}"),
        "createdAt": created_at,
        "location": "Tel Aviv",
    }))
}

pub fn comment_doc(post_id: &str, text: &str, created_at: &str) -> Document {
    doc(json!({
        "postId": post_id,
        "userId": "u2",
        "text": text,
        "createdAt": created_at,
    }))
}

pub fn ids<E: helphero::models::Entity>(rows: &[E]) -> Vec<String> {
    rows.iter().map(|row| row.id().to_string()).collect()
}
