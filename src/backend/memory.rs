// SPDX-License-Identifier: MPL-2.0

//! In-process document feed.
//!
//! Implements the full `DocumentFeed` contract against process memory: writes are
//! fanned out to every live listener of the collection as single-change batches,
//! and new subscriptions receive the ordered snapshot first. Also keeps a log of
//! writes and exposes fault injection so sync behaviour can be exercised without
//! a hosted backend.

use crate::backend::feed::{DocumentFeed, FeedError, FeedEvent, Subscription};
use crate::backend::types::{Document, DocumentChange, OrderBy};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// A write as received by the feed, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedWrite {
    Set {
        collection: String,
        id: String,
        body: Document,
    },
    Update {
        collection: String,
        id: String,
        patch: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

struct Listener {
    collection: String,
    tx: mpsc::UnboundedSender<FeedEvent>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Document>>,
    listeners: HashMap<u64, Listener>,
    next_listener_id: u64,
    writes: Vec<FeedWrite>,
    fail_next_subscribe: Option<FeedError>,
    fail_next_write: Option<FeedError>,
}

impl Inner {
    fn broadcast(&mut self, collection: &str, event: FeedEvent) {
        self.listeners.retain(|_, listener| {
            if listener.collection != collection {
                return true;
            }
            // A closed receiver means the subscriber went away without cancelling
            listener.tx.send(event.clone()).is_ok()
        });
    }
}

#[derive(Clone, Default)]
pub struct MemoryFeed {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("feed lock poisoned")
    }

    /// Current body of a document, without going through the async API.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Every write received so far.
    pub fn writes(&self) -> Vec<FeedWrite> {
        self.lock().writes.clone()
    }

    /// Number of live listeners on a collection.
    pub fn listener_count(&self, collection: &str) -> usize {
        self.lock()
            .listeners
            .values()
            .filter(|l| l.collection == collection)
            .count()
    }

    /// Deliver a raw batch to the collection's listeners without touching stored
    /// documents. Lets callers replay arbitrary (including malformed) events.
    pub fn inject(&self, collection: &str, changes: Vec<DocumentChange>) {
        self.lock()
            .broadcast(collection, FeedEvent::Changes(changes));
    }

    /// Fail every live listener on the collection; they are unregistered.
    pub fn fail_listeners(&self, collection: &str, error: FeedError) {
        let mut inner = self.lock();
        for listener in inner.listeners.values() {
            if listener.collection == collection {
                let _ = listener.tx.send(FeedEvent::Error(error.clone()));
            }
        }
        inner.listeners.retain(|_, l| l.collection != collection);
    }

    /// Make the next `set`, `update` or `delete` fail with `error`; nothing is
    /// stored or logged for it.
    pub fn fail_next_write(&self, error: FeedError) {
        self.lock().fail_next_write = Some(error);
    }

    /// Make the next `subscribe` call fail with `error`.
    pub fn fail_next_subscribe(&self, error: FeedError) {
        self.lock().fail_next_subscribe = Some(error);
    }
}

#[async_trait]
impl DocumentFeed for MemoryFeed {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FeedError> {
        Ok(self.document(collection, id))
    }

    async fn set(&self, collection: &str, id: &str, body: Document) -> Result<(), FeedError> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_write.take() {
            return Err(error);
        }
        inner.writes.push(FeedWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            body: body.clone(),
        });

        let previous = inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), body.clone());

        let change = match previous {
            Some(_) => DocumentChange::modified(id, body),
            None => DocumentChange::added(id, body),
        };
        inner.broadcast(collection, FeedEvent::Changes(vec![change]));
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), FeedError> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_write.take() {
            return Err(error);
        }
        let merged = {
            let doc = inner
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| FeedError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            for (field, value) in &patch {
                doc.insert(field.clone(), value.clone());
            }
            doc.clone()
        };

        inner.writes.push(FeedWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        });
        inner.broadcast(
            collection,
            FeedEvent::Changes(vec![DocumentChange::modified(id, merged)]),
        );
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), FeedError> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_write.take() {
            return Err(error);
        }
        inner.writes.push(FeedWrite::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });

        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));

        // Deleting a missing document succeeds silently
        if let Some(body) = removed {
            inner.broadcast(
                collection,
                FeedEvent::Changes(vec![DocumentChange::removed(id, body)]),
            );
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        order: OrderBy,
    ) -> Result<Subscription, FeedError> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_subscribe.take() {
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded_channel();

        let mut snapshot: Vec<(&String, &Document)> = inner
            .collections
            .get(collection)
            .map(|docs| docs.iter().collect())
            .unwrap_or_default();
        // Stable sort over id-ordered documents: ties stay in id order
        snapshot.sort_by(|(_, a), (_, b)| order.compare(a, b));
        let initial = snapshot
            .into_iter()
            .map(|(id, doc)| DocumentChange::added(id.clone(), doc.clone()))
            .collect();
        let _ = tx.send(FeedEvent::Changes(initial));

        let listener_id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.insert(
            listener_id,
            Listener {
                collection: collection.to_string(),
                tx,
            },
        );
        tracing::debug!(collection, listener_id, "listener registered");

        let registry = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = registry.upgrade() {
                if let Ok(mut inner) = inner.lock() {
                    inner.listeners.remove(&listener_id);
                }
            }
        }))
    }
}
