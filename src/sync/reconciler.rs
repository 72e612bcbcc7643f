// SPDX-License-Identifier: MPL-2.0

//! Keeps one local table consistent with one remote collection.
//!
//! A reconciler owns a single feed subscription. Each delivered batch is handed
//! to the blocking pool, applied event by event (upsert on added/modified,
//! delete on removed), and the whole table is then re-read and published to
//! observers in the subscription's order. Batches are applied one after another
//! in arrival order; every mutation is keyed by document id and carries the
//! full document, so re-applying a batch is harmless.
//!
//! Lifecycle: `Idle -> Subscribing -> Active -> Stopped | Faulted`.

use crate::backend::{
    ChangeKind, DocumentChange, DocumentFeed, FeedError, FeedEvent, Subscription,
};
use crate::cache::LocalTable;
use crate::models::Entity;
use crate::state::RetryPolicy;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("could not subscribe to {collection}: {source}")]
    Subscribe {
        collection: &'static str,
        #[source]
        source: FeedError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Subscribing,
    Active,
    Stopped,
    /// The subscription failed for good; no further local mutation happens.
    Faulted(String),
}

impl SyncState {
    pub fn is_running(&self) -> bool {
        matches!(self, SyncState::Subscribing | SyncState::Active)
    }
}

/// What applying one batch did to the local table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub upserted: usize,
    pub deleted: usize,
    /// Malformed documents that were not applied
    pub skipped: usize,
    /// Local store writes that failed
    pub failed: usize,
}

/// Apply a batch of change-events to `table`.
///
/// A malformed document or a failed write only affects its own event.
pub fn apply_batch<E: Entity>(
    table: &dyn LocalTable<E>,
    changes: &[DocumentChange],
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for change in changes {
        let id = change.document_id.as_str();
        match change.kind {
            ChangeKind::Added | ChangeKind::Modified => {
                let row = match E::from_document(id, &change.document) {
                    Ok(row) => row,
                    Err(e) => {
                        tracing::warn!(kind = E::KIND, id, error = %e, "skipping malformed document");
                        outcome.skipped += 1;
                        continue;
                    }
                };

                match table.upsert(&row) {
                    Ok(()) => {
                        tracing::debug!(kind = E::KIND, id, "cached");
                        outcome.upserted += 1;
                    }
                    Err(e) => {
                        tracing::error!(kind = E::KIND, id, error = %e, "failed to cache document");
                        outcome.failed += 1;
                    }
                }
            }
            ChangeKind::Removed => {
                // The body is informational only; the id is what gets deleted
                if let Err(e) = E::from_document(id, &change.document) {
                    tracing::debug!(kind = E::KIND, id, error = %e, "removed document body unreadable");
                }

                match table.delete(id) {
                    Ok(true) => {
                        tracing::debug!(kind = E::KIND, id, "uncached");
                        outcome.deleted += 1;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(kind = E::KIND, id, error = %e, "failed to uncache document");
                        outcome.failed += 1;
                    }
                }
            }
        }
    }

    outcome
}

struct Shared<E> {
    feed: Arc<dyn DocumentFeed>,
    table: Arc<dyn LocalTable<E>>,
    retry: RetryPolicy,
    state: watch::Sender<SyncState>,
    rows: watch::Sender<Vec<E>>,
}

struct Worker {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Sync reconciler for one entity kind.
pub struct SyncReconciler<E: Entity> {
    shared: Arc<Shared<E>>,
    worker: Mutex<Option<Worker>>,
}

impl<E: Entity> SyncReconciler<E> {
    pub fn new(
        feed: Arc<dyn DocumentFeed>,
        table: Arc<dyn LocalTable<E>>,
        retry: RetryPolicy,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        let (rows, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                feed,
                table,
                retry,
                state,
                rows,
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SyncState {
        self.shared.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.shared.state.subscribe()
    }

    /// Observe the authoritative local list, republished after every batch.
    pub fn watch(&self) -> watch::Receiver<Vec<E>> {
        self.shared.rows.subscribe()
    }

    /// Latest published list.
    pub fn current(&self) -> Vec<E> {
        self.shared.rows.borrow().clone()
    }

    /// Subscribe to the remote collection. No-op while already running.
    pub async fn start(&self) -> Result<(), SyncError> {
        let mut worker = self.worker.lock().await;
        if self.state().is_running() {
            tracing::debug!(kind = E::KIND, "sync already running");
            return Ok(());
        }

        self.shared.state.send_replace(SyncState::Subscribing);
        tracing::info!(kind = E::KIND, collection = E::COLLECTION, "starting sync");

        // Show what is cached while the first batch is on its way
        self.shared.publish().await;

        let subscription = match self.shared.feed.subscribe(E::COLLECTION, E::order()).await {
            Ok(subscription) => subscription,
            Err(source) => {
                tracing::error!(kind = E::KIND, error = %source, "subscription failed");
                self.shared
                    .state
                    .send_replace(SyncState::Faulted(source.to_string()));
                return Err(SyncError::Subscribe {
                    collection: E::COLLECTION,
                    source,
                });
            }
        };

        self.shared.state.send_replace(SyncState::Active);

        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run(self.shared.clone(), subscription, stop_rx));
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Cancel the subscription and wait for the in-flight batch to finish.
    /// Leaves `Idle`, `Stopped` and `Faulted` as they are.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(Worker { stop, handle }) = worker.take() {
            let _ = stop.send(());
            if let Err(e) = handle.await {
                tracing::error!(kind = E::KIND, error = %e, "sync task ended abnormally");
            }
        }

        if self.state().is_running() {
            self.shared.state.send_replace(SyncState::Stopped);
            tracing::info!(kind = E::KIND, "sync stopped");
        }
    }
}

impl<E: Entity> Shared<E> {
    /// Apply one batch off the async workers, then republish the table.
    async fn process(&self, changes: Vec<DocumentChange>) {
        let table = self.table.clone();
        let result = tokio::task::spawn_blocking(move || {
            let outcome = apply_batch(table.as_ref(), &changes);
            (outcome, table.get_all(E::ORDER_DIRECTION))
        })
        .await;

        match result {
            Ok((outcome, Ok(rows))) => {
                tracing::debug!(
                    kind = E::KIND,
                    upserted = outcome.upserted,
                    deleted = outcome.deleted,
                    skipped = outcome.skipped,
                    failed = outcome.failed,
                    total = rows.len(),
                    "batch applied"
                );
                self.rows.send_replace(rows);
            }
            Ok((_, Err(e))) => {
                tracing::error!(kind = E::KIND, error = %e, "failed to read back local table");
            }
            Err(e) => {
                tracing::error!(kind = E::KIND, error = %e, "batch task failed");
            }
        }
    }

    async fn publish(&self) {
        let table = self.table.clone();
        match tokio::task::spawn_blocking(move || table.get_all(E::ORDER_DIRECTION)).await {
            Ok(Ok(rows)) => {
                self.rows.send_replace(rows);
            }
            Ok(Err(e)) => tracing::error!(kind = E::KIND, error = %e, "failed to read local table"),
            Err(e) => tracing::error!(kind = E::KIND, error = %e, "read task failed"),
        }
    }

    /// Re-subscribe with backoff. `None` when stopped or out of attempts.
    async fn resubscribe(
        &self,
        mut error: FeedError,
        stop: &mut oneshot::Receiver<()>,
    ) -> Option<Subscription> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > self.retry.max_attempts {
                tracing::error!(kind = E::KIND, error = %error, "sync faulted");
                self.state.send_replace(SyncState::Faulted(error.to_string()));
                return None;
            }

            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                kind = E::KIND,
                error = %error,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "feed subscription lost, retrying"
            );
            self.state.send_replace(SyncState::Subscribing);

            tokio::select! {
                _ = &mut *stop => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            match self.feed.subscribe(E::COLLECTION, E::order()).await {
                Ok(subscription) => {
                    tracing::info!(kind = E::KIND, attempt, "feed subscription restored");
                    self.state.send_replace(SyncState::Active);
                    return Some(subscription);
                }
                Err(e) => error = e,
            }
        }
    }
}

async fn run<E: Entity>(
    shared: Arc<Shared<E>>,
    mut subscription: Subscription,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let event = tokio::select! {
            _ = &mut stop => return,
            event = subscription.next() => event,
        };

        let error = match event {
            Some(FeedEvent::Changes(changes)) => {
                shared.process(changes).await;
                continue;
            }
            Some(FeedEvent::Error(e)) => e,
            None => FeedError::Closed,
        };

        tracing::error!(kind = E::KIND, error = %error, "feed subscription failed");
        drop(subscription);
        subscription = match shared.resubscribe(error, &mut stop).await {
            Some(subscription) => subscription,
            None => return,
        };
    }
}
