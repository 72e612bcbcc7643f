// SPDX-License-Identifier: MPL-2.0

mod reconciler;

pub use reconciler::{BatchOutcome, SyncError, SyncReconciler, SyncState, apply_batch};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Document, DocumentChange, DocumentFeed, FeedError, MemoryFeed};
    use crate::backend::Direction;
    use crate::cache::{CacheDb, CacheError, LocalTable, PostCache};
    use crate::models::{Entity, Post};
    use crate::state::RetryPolicy;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn post_doc(title: &str, created_at: &str) -> Document {
        json!({
            "userId": "u1",
            "title": title,
            "description": "",
            "createdAt": created_at,
            "location": "Haifa",
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn table() -> PostCache {
        PostCache::new(CacheDb::open_in_memory().unwrap())
    }

    #[test]
    fn batch_skips_malformed_documents() {
        let table = table();
        let mut broken = post_doc("broken", "2024-01-01T00:00:00Z");
        broken.remove("userId");

        let outcome = apply_batch::<Post>(
            &table,
            &[
                DocumentChange::added("p1", post_doc("one", "2024-01-01T00:00:00Z")),
                DocumentChange::added("p2", broken),
                DocumentChange::added("p3", post_doc("three", "2024-01-03T00:00:00Z")),
            ],
        );

        assert_eq!(
            outcome,
            BatchOutcome {
                upserted: 2,
                skipped: 1,
                ..Default::default()
            }
        );
        assert!(table.get("p2").unwrap().is_none());
        assert_eq!(table.get_all(Post::ORDER_DIRECTION).unwrap().len(), 2);
    }

    /// Rejects writes for one id and forwards everything else.
    struct FlakyTable {
        inner: PostCache,
        broken_id: &'static str,
    }

    impl FlakyTable {
        fn check(&self, id: &str) -> Result<(), CacheError> {
            if id == self.broken_id {
                return Err(CacheError::Database(rusqlite::Error::InvalidQuery));
            }
            Ok(())
        }
    }

    impl LocalTable<Post> for FlakyTable {
        fn get(&self, id: &str) -> Result<Option<Post>, CacheError> {
            self.inner.get(id)
        }

        fn get_all(&self, direction: Direction) -> Result<Vec<Post>, CacheError> {
            self.inner.get_all(direction)
        }

        fn get_by_secondary_key(&self, key: &str) -> Result<Vec<Post>, CacheError> {
            self.inner.get_by_secondary_key(key)
        }

        fn upsert(&self, row: &Post) -> Result<(), CacheError> {
            self.check(&row.id)?;
            self.inner.upsert(row)
        }

        fn update(&self, row: &Post) -> Result<bool, CacheError> {
            self.check(&row.id)?;
            self.inner.update(row)
        }

        fn delete(&self, id: &str) -> Result<bool, CacheError> {
            self.check(id)?;
            self.inner.delete(id)
        }
    }

    #[test]
    fn failed_write_does_not_stop_the_batch() {
        let table = FlakyTable {
            inner: table(),
            broken_id: "p2",
        };

        let outcome = apply_batch::<Post>(
            &table,
            &[
                DocumentChange::added("p1", post_doc("one", "2024-01-01T00:00:00Z")),
                DocumentChange::added("p2", post_doc("two", "2024-01-02T00:00:00Z")),
                DocumentChange::removed("p2", Document::new()),
                DocumentChange::added("p3", post_doc("three", "2024-01-03T00:00:00Z")),
            ],
        );

        assert_eq!(
            outcome,
            BatchOutcome {
                upserted: 2,
                failed: 2,
                ..Default::default()
            }
        );
        let ids: Vec<_> = table
            .get_all(Post::ORDER_DIRECTION)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p3", "p1"]);
    }

    #[test]
    fn removal_only_needs_the_id() {
        let table = table();
        apply_batch::<Post>(
            &table,
            &[DocumentChange::added("p1", post_doc("one", "2024-01-01T00:00:00Z"))],
        );

        let removal = [DocumentChange::removed("p1", Document::new())];
        let outcome = apply_batch::<Post>(&table, &removal);
        assert_eq!(outcome.deleted, 1);
        assert!(table.get("p1").unwrap().is_none());

        // Already gone
        let outcome = apply_batch::<Post>(&table, &removal);
        assert_eq!(outcome, BatchOutcome::default());
    }

    #[test]
    fn reapplying_a_batch_changes_nothing() {
        let table = table();
        let batch = vec![
            DocumentChange::added("p1", post_doc("one", "2024-01-01T00:00:00Z")),
            DocumentChange::modified("p1", post_doc("edited", "2024-01-01T00:00:00Z")),
        ];
        apply_batch::<Post>(&table, &batch);
        let first = table.get_all(Post::ORDER_DIRECTION).unwrap();
        apply_batch::<Post>(&table, &batch);

        assert_eq!(table.get_all(Post::ORDER_DIRECTION).unwrap(), first);
        assert_eq!(first[0].title, "edited");
    }

    fn reconciler(feed: &MemoryFeed, retry: RetryPolicy) -> SyncReconciler<Post> {
        SyncReconciler::<Post>::new(Arc::new(feed.clone()), Arc::new(table()), retry)
    }

    #[tokio::test]
    async fn start_twice_subscribes_once() {
        let feed = MemoryFeed::new();
        let sync = reconciler(&feed, RetryPolicy::NEVER);

        sync.start().await.unwrap();
        sync.start().await.unwrap();
        assert_eq!(sync.state(), SyncState::Active);
        assert_eq!(feed.listener_count("posts"), 1);

        sync.stop().await;
        assert_eq!(sync.state(), SyncState::Stopped);
        assert_eq!(feed.listener_count("posts"), 0);
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let sync = reconciler(&MemoryFeed::new(), RetryPolicy::NEVER);
        sync.stop().await;
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn failed_subscribe_faults() {
        let feed = MemoryFeed::new();
        feed.fail_next_subscribe(FeedError::PermissionDenied("posts".into()));
        let sync = reconciler(&feed, RetryPolicy::NEVER);

        assert!(matches!(sync.start().await, Err(SyncError::Subscribe { .. })));
        assert!(matches!(sync.state(), SyncState::Faulted(_)));

        // An explicit restart recovers
        sync.start().await.unwrap();
        assert_eq!(sync.state(), SyncState::Active);
        sync.stop().await;
    }

    #[tokio::test]
    async fn feed_error_without_retry_faults() {
        let feed = MemoryFeed::new();
        let sync = reconciler(&feed, RetryPolicy::NEVER);
        let mut state = sync.watch_state();
        sync.start().await.unwrap();

        feed.fail_listeners("posts", FeedError::Unavailable("offline".into()));
        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| matches!(s, SyncState::Faulted(_))),
        )
        .await
        .unwrap()
        .unwrap();

        // Nothing is applied once faulted
        feed.set("posts", "p1", post_doc("one", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sync.current().is_empty());
    }
}
