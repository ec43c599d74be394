//! Short-horizon session boosts.
//!
//! High-intent actions (writing a review, wishlisting, bookmarking) bump a
//! per-user hash of recently touched books. The bucket is hard-bounded:
//! after every write a server-side trim keeps only the top entries, so a
//! scripted burst of events cannot grow a user's bucket without limit.

use crate::clients::{self, KeyValueStore, ReviewLookup};
use crate::consumers::EventSink;
use crate::services::tracking::resolve_book_target;
use async_trait::async_trait;
use event_schema::{EventKind, EventRecord};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// Session boosts fade after two hours without activity.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 7200;
/// At most this many boosted books per user.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Boost deltas per event kind. Kinds outside this table contribute no
/// session signal.
#[derive(Debug, Clone)]
pub struct BoostDeltas {
    pub review_create: f64,
    pub wishlist_add: f64,
    pub bookmark: f64,
}

impl Default for BoostDeltas {
    fn default() -> Self {
        Self {
            review_create: 0.05,
            wishlist_add: 0.20,
            bookmark: 0.05,
        }
    }
}

impl BoostDeltas {
    fn delta_for(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::ReviewCreate => self.review_create,
            EventKind::WishlistAdd => self.wishlist_add,
            EventKind::Bookmark => self.bookmark,
            _ => 0.0,
        }
    }
}

/// Bounded per-user boost bucket.
pub struct SessionBoostBucket {
    store: Arc<dyn KeyValueStore>,
    bucket: String,
    ttl_seconds: i64,
    max_entries: usize,
}

impl SessionBoostBucket {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            bucket: "books".to_string(),
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_limits(mut self, ttl_seconds: i64, max_entries: usize) -> Self {
        self.ttl_seconds = ttl_seconds;
        self.max_entries = max_entries;
        self
    }

    fn bucket_key(&self, user_id: i64) -> String {
        format!("session:{}:{}", user_id, self.bucket)
    }

    /// Bump one target's boost, refresh the bucket TTL and trim back to the
    /// top entries. The trim runs server-side; reading the bucket into the
    /// client to cut it would race against concurrent writers.
    pub async fn apply(&self, user_id: i64, target_id: i64, delta: f64) -> clients::Result<()> {
        let key = self.bucket_key(user_id);
        self.store
            .increment_hash_field(&key, &target_id.to_string(), delta)
            .await?;
        self.store.refresh_ttl(&key, self.ttl_seconds).await?;
        let removed = self.store.trim_hash_top_k(&key, self.max_entries).await?;
        if removed > 0 {
            debug!(user_id, removed, "trimmed session boost bucket");
        }
        Ok(())
    }

    /// Current boosts for a user, strongest first. Fields that fail to
    /// parse are skipped.
    pub async fn boosts_for(&self, user_id: i64) -> clients::Result<Vec<(i64, f64)>> {
        let raw = self.store.read_hash(&self.bucket_key(user_id)).await?;
        let mut boosts: Vec<(i64, f64)> = raw
            .into_iter()
            .filter_map(|(field, value)| Some((field.parse().ok()?, value.parse().ok()?)))
            .collect();
        boosts.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        Ok(boosts)
    }
}

/// Feeds high-intent events into the session boost bucket.
pub struct SessionBoostSink {
    bucket: SessionBoostBucket,
    reviews: Arc<dyn ReviewLookup>,
    deltas: BoostDeltas,
}

impl SessionBoostSink {
    pub fn new(bucket: SessionBoostBucket, reviews: Arc<dyn ReviewLookup>) -> Self {
        Self {
            bucket,
            reviews,
            deltas: BoostDeltas::default(),
        }
    }

    pub fn with_deltas(mut self, deltas: BoostDeltas) -> Self {
        self.deltas = deltas;
        self
    }
}

#[async_trait]
impl EventSink for SessionBoostSink {
    fn name(&self) -> &'static str {
        "session_boost"
    }

    async fn handle(&self, event: EventRecord) {
        let Some(user_id) = event.user_id else {
            return;
        };
        let Some(kind) = event.kind() else {
            return;
        };
        let delta = self.deltas.delta_for(kind);
        if delta == 0.0 {
            return;
        }
        let Some(book_id) = resolve_book_target(&event, self.reviews.as_ref()).await else {
            return;
        };

        if let Err(err) = self.bucket.apply(user_id, book_id, delta).await {
            warn!(user_id, book_id, error = %err, "failed to apply session boost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockKeyValueStore, MockReviewLookup};
    use mockall::Sequence;
    use std::collections::HashMap;

    #[test]
    fn test_delta_table() {
        let deltas = BoostDeltas::default();
        assert!((deltas.delta_for(EventKind::WishlistAdd) - 0.20).abs() < 1e-9);
        assert!((deltas.delta_for(EventKind::ReviewCreate) - 0.05).abs() < 1e-9);
        assert!((deltas.delta_for(EventKind::Bookmark) - 0.05).abs() < 1e-9);
        assert!(deltas.delta_for(EventKind::Click).abs() < 1e-9);
        assert!(deltas.delta_for(EventKind::Like).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_apply_increments_refreshes_then_trims() {
        let mut store = MockKeyValueStore::new();
        let mut seq = Sequence::new();
        store
            .expect_increment_hash_field()
            .withf(|key, field, delta| {
                key == "session:1:books" && field == "7" && (*delta - 0.2).abs() < 1e-9
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        store
            .expect_refresh_ttl()
            .withf(|key, ttl| key == "session:1:books" && *ttl == DEFAULT_SESSION_TTL_SECONDS)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        store
            .expect_trim_hash_top_k()
            .withf(|key, max| key == "session:1:books" && *max == DEFAULT_MAX_ENTRIES)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(0));

        SessionBoostBucket::new(Arc::new(store))
            .apply(1, 7, 0.2)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_low_intent_events_never_touch_the_bucket() {
        let mut store = MockKeyValueStore::new();
        store.expect_increment_hash_field().times(0);
        let mut reviews = MockReviewLookup::new();
        reviews.expect_review_by_id().times(0);

        let sink = SessionBoostSink::new(
            SessionBoostBucket::new(Arc::new(store)),
            Arc::new(reviews),
        );
        sink.handle(EventRecord::new(1, "click", "book", 7))
            .await;
        // Kind checks run before any review lookup, so ignored kinds cost
        // nothing even when review-scoped.
    }

    #[tokio::test]
    async fn test_wishlist_add_flows_through() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_increment_hash_field()
            .withf(|_, field, delta| field == "7" && (*delta - 0.2).abs() < 1e-9)
            .times(1)
            .returning(|_, _, _| Ok(()));
        store.expect_refresh_ttl().returning(|_, _| Ok(()));
        store.expect_trim_hash_top_k().returning(|_, _| Ok(0));
        let reviews = MockReviewLookup::new();

        let sink = SessionBoostSink::new(
            SessionBoostBucket::new(Arc::new(store)),
            Arc::new(reviews),
        );
        sink.handle(EventRecord::new(1, "wishlist_add", "book", 7))
            .await;
    }

    #[tokio::test]
    async fn test_boosts_for_sorts_strongest_first() {
        let mut store = MockKeyValueStore::new();
        store.expect_read_hash().returning(|_| {
            let mut raw = HashMap::new();
            raw.insert("7".to_string(), "0.05".to_string());
            raw.insert("8".to_string(), "0.40".to_string());
            raw.insert("junk".to_string(), "0.99".to_string());
            Ok(raw)
        });

        let boosts = SessionBoostBucket::new(Arc::new(store))
            .boosts_for(1)
            .await
            .unwrap();

        assert_eq!(boosts.len(), 2);
        assert_eq!(boosts[0].0, 8);
        assert!((boosts[0].1 - 0.40).abs() < 1e-9);
    }
}
