// SPDX-License-Identifier: MPL-2.0

use crate::config::USER_AGENT;
use crate::media::MediaBlob;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("storage rejected request: HTTP {0}")]
    Status(u16),
    #[error("invalid object url: {0}")]
    InvalidUrl(String),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage for post images and profile photos.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `blob` under `key`, returning its durable download URL.
    async fn upload(&self, key: &str, blob: MediaBlob) -> Result<String, StorageError>;

    /// Remove the object behind a URL previously returned by `upload`.
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

/// Object storage reached over plain HTTP (`PUT`/`DELETE` per object).
pub struct HttpObjectStore {
    http: reqwest::Client,
    base: Url,
}

impl HttpObjectStore {
    pub fn new(base_url: &str) -> Result<Self, StorageError> {
        let mut base =
            Url::parse(base_url).map_err(|e| StorageError::InvalidUrl(format!("{base_url}: {e}")))?;
        // Url::join drops the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { http, base })
    }

    /// URL an object with `key` is served from.
    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        self.base
            .join(key.trim_start_matches('/'))
            .map_err(|e| StorageError::InvalidUrl(format!("{key}: {e}")))
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, key: &str, blob: MediaBlob) -> Result<String, StorageError> {
        let url = self.object_url(key)?;
        let response = self
            .http
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, blob.content_type)
            .body(blob.bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Status(response.status().as_u16()));
        }

        tracing::debug!(%url, "object uploaded");
        Ok(url.to_string())
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let url = Url::parse(url).map_err(|e| StorageError::InvalidUrl(format!("{url}: {e}")))?;
        let response = self.http.delete(url.clone()).send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound(url.to_string())),
            status => Err(StorageError::Status(status.as_u16())),
        }
    }
}

/// A call received by `MemoryObjectStore`, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Upload { key: String, ok: bool },
    Delete { url: String, ok: bool },
}

#[derive(Default)]
struct MemoryObjects {
    objects: HashMap<String, MediaBlob>,
    calls: Vec<StorageCall>,
    fail_uploads: bool,
    fail_deletes: bool,
}

/// In-process object store; URLs take the form `mem://<key>`.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<Mutex<MemoryObjects>>,
}

const MEMORY_SCHEME: &str = "mem://";

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryObjects> {
        self.inner.lock().expect("object store lock poisoned")
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.lock().fail_deletes = fail;
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.lock().calls.clone()
    }

    pub fn contains(&self, url: &str) -> bool {
        url.strip_prefix(MEMORY_SCHEME)
            .is_some_and(|key| self.lock().objects.contains_key(key))
    }

    /// Seed an object directly, returning its URL.
    pub fn insert(&self, key: &str, blob: MediaBlob) -> String {
        self.lock().objects.insert(key.to_string(), blob);
        format!("{MEMORY_SCHEME}{key}")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, blob: MediaBlob) -> Result<String, StorageError> {
        let mut inner = self.lock();
        let ok = !inner.fail_uploads;
        inner.calls.push(StorageCall::Upload {
            key: key.to_string(),
            ok,
        });
        if !ok {
            return Err(StorageError::Unavailable("upload rejected".to_string()));
        }

        inner.objects.insert(key.to_string(), blob);
        Ok(format!("{MEMORY_SCHEME}{key}"))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let removed = !inner.fail_deletes
            && url
                .strip_prefix(MEMORY_SCHEME)
                .is_some_and(|key| inner.objects.remove(key).is_some());
        inner.calls.push(StorageCall::Delete {
            url: url.to_string(),
            ok: removed,
        });

        if inner.fail_deletes {
            Err(StorageError::Unavailable("delete rejected".to_string()))
        } else if removed {
            Ok(())
        } else {
            Err(StorageError::NotFound(url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> MediaBlob {
        MediaBlob::new(vec![1, 2, 3], "image/jpeg")
    }

    #[test]
    fn object_url_keeps_base_path() {
        let store = HttpObjectStore::new("https://files.example.com/helphero").unwrap();
        assert_eq!(
            store.object_url("posts/abc").unwrap().as_str(),
            "https://files.example.com/helphero/posts/abc"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpObjectStore::new("not a url"),
            Err(StorageError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn memory_store_round_trips_urls() {
        let store = MemoryObjectStore::new();
        let url = store.upload("posts/p1", blob()).await.unwrap();
        assert_eq!(url, "mem://posts/p1");
        assert!(store.contains(&url));

        store.delete(&url).await.unwrap();
        assert!(!store.contains(&url));
    }

    #[tokio::test]
    async fn failed_upload_is_recorded() {
        let store = MemoryObjectStore::new();
        store.set_fail_uploads(true);
        assert!(store.upload("posts/p1", blob()).await.is_err());
        assert_eq!(
            store.calls(),
            vec![StorageCall::Upload {
                key: "posts/p1".into(),
                ok: false
            }]
        );
        assert!(!store.contains("mem://posts/p1"));
    }

    #[tokio::test]
    async fn deleting_unknown_object_is_not_found() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.delete("mem://posts/missing").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
