use super::{AffinityCache, EventWeights};
use crate::clients::ReviewLookup;
use crate::consumers::EventSink;
use async_trait::async_trait;
use event_schema::{EventRecord, TARGET_BOOK, TARGET_REVIEW};
use std::sync::Arc;
use tracing::{debug, warn};

/// Folds behavior events into per-user affinity scores.
///
/// Every guard here drops the event silently at debug level; behavior
/// traffic is noisy by nature and an unresolvable event is routine, not an
/// error. Replays over-count slightly and that is accepted.
pub struct AffinityTrackingSink {
    cache: AffinityCache,
    reviews: Arc<dyn ReviewLookup>,
    weights: EventWeights,
}

impl AffinityTrackingSink {
    pub fn new(cache: AffinityCache, reviews: Arc<dyn ReviewLookup>) -> Self {
        Self {
            cache,
            reviews,
            weights: EventWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: EventWeights) -> Self {
        self.weights = weights;
        self
    }
}

#[async_trait]
impl EventSink for AffinityTrackingSink {
    fn name(&self) -> &'static str {
        "affinity_tracking"
    }

    async fn handle(&self, event: EventRecord) {
        let Some(user_id) = event.user_id else {
            return;
        };
        let Some(kind) = event.kind() else {
            debug!(event_type = ?event.event_type, "skipping event with unrecognized kind");
            return;
        };
        let weight = self.weights.weight_for(kind, &event);
        if weight == 0.0 {
            return;
        }
        let Some(book_id) = resolve_book_target(&event, self.reviews.as_ref()).await else {
            return;
        };

        if let Err(err) = self.cache.increment(user_id, book_id, weight).await {
            warn!(user_id, book_id, error = %err, "failed to update affinity score");
        }
    }
}

/// Resolve an event's target down to a book id.
///
/// Book targets pass through; review targets are looked up so the score
/// lands on the reviewed book. Any resolution failure drops the event.
pub(crate) async fn resolve_book_target(
    event: &EventRecord,
    reviews: &dyn ReviewLookup,
) -> Option<i64> {
    let (target_type, target_id) = event.resolved_target()?;
    match target_type.as_str() {
        TARGET_BOOK => Some(target_id),
        TARGET_REVIEW => match reviews.review_by_id(target_id).await {
            Ok(record) => Some(record.book_id),
            Err(err) => {
                debug!(review_id = target_id, error = %err, "dropping event for unresolvable review");
                None
            }
        },
        other => {
            debug!(target_type = other, "skipping event with unrecognized target type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, MockKeyValueStore, MockReviewLookup, ReviewRecord};
    use serde_json::json;

    fn sink(store: MockKeyValueStore, reviews: MockReviewLookup) -> AffinityTrackingSink {
        AffinityTrackingSink::new(AffinityCache::new(Arc::new(store)), Arc::new(reviews))
    }

    #[tokio::test]
    async fn test_book_click_lands_on_the_book_key() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_increment_key()
            .withf(|key, delta, _| key == "affinity:1:7" && (*delta - 0.2).abs() < 1e-9)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut reviews = MockReviewLookup::new();
        reviews.expect_review_by_id().times(0);

        sink(store, reviews)
            .handle(EventRecord::new(1, "click", "book", 7))
            .await;
    }

    #[tokio::test]
    async fn test_review_events_resolve_to_the_reviewed_book() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_increment_key()
            .withf(|key, _, _| key == "affinity:1:55")
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut reviews = MockReviewLookup::new();
        reviews.expect_review_by_id().with(mockall::predicate::eq(99)).returning(|_| {
            Ok(ReviewRecord {
                id: 99,
                user_id: 3,
                book_id: 55,
            })
        });

        sink(store, reviews)
            .handle(EventRecord::new(1, "like", "review", 99))
            .await;
    }

    #[tokio::test]
    async fn test_unresolvable_review_drops_the_event() {
        let mut store = MockKeyValueStore::new();
        store.expect_increment_key().times(0);
        let mut reviews = MockReviewLookup::new();
        reviews
            .expect_review_by_id()
            .returning(|id| Err(ClientError::ReviewNotFound(id)));

        sink(store, reviews)
            .handle(EventRecord::new(1, "like", "review", 99))
            .await;
    }

    #[tokio::test]
    async fn test_anonymous_events_are_ignored() {
        let mut store = MockKeyValueStore::new();
        store.expect_increment_key().times(0);
        let reviews = MockReviewLookup::new();

        let mut event = EventRecord::new(1, "click", "book", 7);
        event.user_id = None;
        sink(store, reviews).handle(event).await;
    }

    #[tokio::test]
    async fn test_unknown_event_types_are_ignored() {
        let mut store = MockKeyValueStore::new();
        store.expect_increment_key().times(0);
        let reviews = MockReviewLookup::new();

        sink(store, reviews)
            .handle(EventRecord::new(1, "purchase", "book", 7))
            .await;
    }

    #[tokio::test]
    async fn test_zero_weight_events_produce_no_write() {
        let mut store = MockKeyValueStore::new();
        store.expect_increment_key().times(0);
        let reviews = MockReviewLookup::new();

        // Wishlist adds weigh zero for affinity; so does a dwell without a
        // reported duration.
        sink(store, reviews)
            .handle(EventRecord::new(1, "wishlist_add", "book", 7))
            .await;
    }

    #[tokio::test]
    async fn test_metadata_magnitude_flows_into_the_delta() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_increment_key()
            .withf(|_, delta, _| (*delta - 1.5).abs() < 1e-9)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let reviews = MockReviewLookup::new();

        sink(store, reviews)
            .handle(
                EventRecord::new(1, "dwell", "book", 7)
                    .with_metadata(json!({ "dwell_ms": 60_000 })),
            )
            .await;
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let mut store = MockKeyValueStore::new();
        store.expect_increment_key().returning(|_, _, _| {
            Err(ClientError::Timeout {
                operation: "increment_key",
                timeout: std::time::Duration::from_millis(100),
            })
        });
        let reviews = MockReviewLookup::new();

        // Must not panic or propagate.
        sink(store, reviews)
            .handle(EventRecord::new(1, "click", "book", 7))
            .await;
    }
}
