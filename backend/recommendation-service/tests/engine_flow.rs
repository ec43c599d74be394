//! End-to-end flows over in-memory stores: behavior events in, boosted
//! recommendation pages out.

use async_trait::async_trait;
use event_schema::EventRecord;
use recommendation_service::clients::{
    self, BookDocument, ClientError, GraphStore, KeyValueStore, ReviewDocument, ReviewLookup,
    ReviewRecord, SearchIndex, SimilarReaderReview,
};
use recommendation_service::consumers::EventSink;
use recommendation_service::models::{SamplingMode, SamplingParams, ShuffleConfig};
use recommendation_service::services::boost::{SessionBoostBucket, SessionBoostSink};
use recommendation_service::services::tracking::{AffinityCache, AffinityTrackingSink};
use recommendation_service::{EngineTuning, RecommendationEngine};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory stand-in for Redis, including the top-K trim semantics.
#[derive(Default)]
struct MemoryStore {
    keys: Mutex<HashMap<String, f64>>,
    hashes: Mutex<HashMap<String, HashMap<String, f64>>>,
}

impl MemoryStore {
    fn key_value(&self, key: &str) -> Option<f64> {
        self.keys.lock().unwrap().get(key).copied()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn increment_key(&self, key: &str, delta: f64, _ttl_seconds: i64) -> clients::Result<()> {
        *self
            .keys
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0.0) += delta;
        Ok(())
    }

    async fn increment_hash_field(
        &self,
        key: &str,
        field: &str,
        delta: f64,
    ) -> clients::Result<()> {
        *self
            .hashes
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0.0) += delta;
        Ok(())
    }

    async fn refresh_ttl(&self, _key: &str, _ttl_seconds: i64) -> clients::Result<()> {
        Ok(())
    }

    async fn trim_hash_top_k(&self, key: &str, max_entries: usize) -> clients::Result<u64> {
        let mut hashes = self.hashes.lock().unwrap();
        let Some(bucket) = hashes.get_mut(key) else {
            return Ok(0);
        };
        if bucket.len() <= max_entries {
            return Ok(0);
        }

        let mut entries: Vec<(String, f64)> =
            bucket.iter().map(|(field, value)| (field.clone(), *value)).collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        let mut removed = 0;
        for (field, _) in entries.into_iter().skip(max_entries) {
            bucket.remove(&field);
            removed += 1;
        }
        Ok(removed)
    }

    async fn read_hash(&self, key: &str) -> clients::Result<HashMap<String, String>> {
        Ok(self
            .hashes
            .lock()
            .unwrap()
            .get(key)
            .map(|bucket| {
                bucket
                    .iter()
                    .map(|(field, value)| (field.clone(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_keys(&self, keys: &[String]) -> clients::Result<Vec<Option<String>>> {
        let store = self.keys.lock().unwrap();
        Ok(keys
            .iter()
            .map(|key| store.get(key).map(|value| value.to_string()))
            .collect())
    }
}

/// Fixed reading-graph answers: user 7 has strong collaborative overlap on
/// book 101, which also shows up through related paths.
struct StaticGraph;

#[async_trait]
impl GraphStore for StaticGraph {
    async fn similar_reader_favorites(
        &self,
        _user_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<(i64, i64)>> {
        Ok(vec![(101, 10), (102, 4)]
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn genre_overlap_books(
        &self,
        _user_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<(i64, i64)>> {
        Ok(vec![(103, 3)].into_iter().take(limit as usize).collect())
    }

    async fn author_overlap_books(
        &self,
        _user_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<(i64, i64)>> {
        Ok(vec![(104, 2)].into_iter().take(limit as usize).collect())
    }

    async fn related_path_books(
        &self,
        _user_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<(i64, i64)>> {
        Ok(vec![(101, 5)].into_iter().take(limit as usize).collect())
    }

    async fn reviews_by_similar_readers(
        &self,
        _user_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<SimilarReaderReview>> {
        Ok(vec![
            SimilarReaderReview {
                review_id: 501,
                similarity: Some(5.0),
            },
            SimilarReaderReview {
                review_id: 502,
                similarity: None,
            },
        ]
        .into_iter()
        .take(limit as usize)
        .collect())
    }

    async fn recently_interacted_books(
        &self,
        _user_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<i64>> {
        Ok(vec![201].into_iter().take(limit as usize).collect())
    }

    async fn reviews_for_books(
        &self,
        _book_ids: &[i64],
        limit: i64,
    ) -> clients::Result<Vec<i64>> {
        Ok(vec![503, 504].into_iter().take(limit as usize).collect())
    }
}

/// Fixed index answers: a spread of popular books with distinct view
/// counts, ids 1 through 25.
struct StaticIndex;

fn book_doc(id: i64, views: u64) -> BookDocument {
    BookDocument {
        id,
        title: format!("Book {id}"),
        authors: vec![],
        genres: vec![],
        view_count: views,
        wishlist_count: 0,
        review_count: 0,
    }
}

fn review_doc(id: i64, likes: u64) -> ReviewDocument {
    ReviewDocument {
        id,
        book_id: 1,
        like_count: likes,
        comment_count: 0,
        bookmark_count: 0,
        view_count: 0,
        created_at: None,
    }
}

#[async_trait]
impl SearchIndex for StaticIndex {
    async fn popular_books(&self, limit: i64) -> clients::Result<Vec<BookDocument>> {
        Ok((1..=25)
            .map(|id| book_doc(id, (26 - id) as u64 * 100))
            .take(limit as usize)
            .collect())
    }

    async fn similar_books(&self, _book_id: i64, limit: i64) -> clients::Result<Vec<BookDocument>> {
        Ok(vec![book_doc(301, 0), book_doc(302, 0)]
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn search_books(&self, _text: &str, limit: i64) -> clients::Result<Vec<BookDocument>> {
        Ok(vec![book_doc(401, 0)].into_iter().take(limit as usize).collect())
    }

    async fn reviews_by_likes(&self, limit: i64) -> clients::Result<Vec<ReviewDocument>> {
        Ok(vec![review_doc(601, 40), review_doc(602, 10)]
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn recent_reviews(&self, limit: i64) -> clients::Result<Vec<ReviewDocument>> {
        Ok(vec![review_doc(603, 0)].into_iter().take(limit as usize).collect())
    }

    async fn public_reviews_for_book(
        &self,
        _book_id: i64,
        limit: i64,
    ) -> clients::Result<Vec<ReviewDocument>> {
        Ok(vec![review_doc(604, 25)].into_iter().take(limit as usize).collect())
    }
}

/// An index whose every call times out.
struct DownIndex;

macro_rules! down {
    () => {
        Err(ClientError::Timeout {
            operation: "search",
            timeout: Duration::from_millis(100),
        })
    };
}

#[async_trait]
impl SearchIndex for DownIndex {
    async fn popular_books(&self, _limit: i64) -> clients::Result<Vec<BookDocument>> {
        down!()
    }
    async fn similar_books(
        &self,
        _book_id: i64,
        _limit: i64,
    ) -> clients::Result<Vec<BookDocument>> {
        down!()
    }
    async fn search_books(&self, _text: &str, _limit: i64) -> clients::Result<Vec<BookDocument>> {
        down!()
    }
    async fn reviews_by_likes(&self, _limit: i64) -> clients::Result<Vec<ReviewDocument>> {
        down!()
    }
    async fn recent_reviews(&self, _limit: i64) -> clients::Result<Vec<ReviewDocument>> {
        down!()
    }
    async fn public_reviews_for_book(
        &self,
        _book_id: i64,
        _limit: i64,
    ) -> clients::Result<Vec<ReviewDocument>> {
        down!()
    }
}

/// Review 900 belongs to book 355; everything else is unknown.
struct StaticReviews;

#[async_trait]
impl ReviewLookup for StaticReviews {
    async fn review_by_id(&self, review_id: i64) -> clients::Result<ReviewRecord> {
        if review_id == 900 {
            Ok(ReviewRecord {
                id: 900,
                user_id: 3,
                book_id: 355,
            })
        } else {
            Err(ClientError::ReviewNotFound(review_id))
        }
    }
}

fn engine_over(store: Arc<MemoryStore>) -> RecommendationEngine {
    RecommendationEngine::with_tuning(
        Arc::new(StaticGraph),
        Arc::new(StaticIndex),
        store,
        EngineTuning {
            affinity_blend_weight: 1.0,
            ..EngineTuning::default()
        },
    )
}

fn unshuffled() -> SamplingParams {
    SamplingParams::new(SamplingMode::None, 0)
}

#[tokio::test]
async fn affinity_events_boost_recommendations() {
    let store = Arc::new(MemoryStore::default());
    let sink = AffinityTrackingSink::new(
        AffinityCache::new(store.clone()),
        Arc::new(StaticReviews),
    );

    // User 7 engages heavily with book 23: click, like, long dwell.
    sink.handle(EventRecord::new(7, "click", "book", 23)).await;
    sink.handle(EventRecord::new(7, "like", "book", 23)).await;
    sink.handle(
        EventRecord::new(7, "dwell", "book", 23).with_metadata(json!({ "dwell_ms": 5000 })),
    )
    .await;

    let affinity = store.key_value("affinity:7:23").unwrap();
    assert!((affinity - 2.0).abs() < 1e-9, "0.2 + 0.3 + capped 1.5");

    // Book 23 sits mid-pack on popularity alone; the stored affinity must
    // pull it to the top of the page.
    let results = engine_over(store).recommend_books(7, 25, unshuffled()).await;
    assert_eq!(results[0].target_id, 23);
    assert_eq!(results[0].rank, 1);
}

#[tokio::test]
async fn review_scoped_events_roll_up_to_the_reviewed_book() {
    let store = Arc::new(MemoryStore::default());
    let sink = AffinityTrackingSink::new(
        AffinityCache::new(store.clone()),
        Arc::new(StaticReviews),
    );

    sink.handle(EventRecord::new(7, "like", "review", 900)).await;
    sink.handle(EventRecord::new(7, "like", "review", 999)).await;

    let rolled_up = store.key_value("affinity:7:355").unwrap();
    assert!((rolled_up - 0.3).abs() < 1e-9);
    assert!(store.key_value("affinity:7:999").is_none());
}

#[tokio::test]
async fn session_bucket_keeps_only_the_strongest_entries() {
    let store = Arc::new(MemoryStore::default());
    let bucket = SessionBoostBucket::new(store.clone()).with_limits(7200, 10);

    // Fifteen books with strictly increasing boosts; the weakest five must
    // be trimmed away as the bucket overflows.
    for book_id in 1..=15 {
        bucket.apply(7, book_id, 0.1 * book_id as f64).await.unwrap();
    }

    let boosts = bucket.boosts_for(7).await.unwrap();
    assert_eq!(boosts.len(), 10);
    let ids: Vec<i64> = boosts.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, (6..=15).rev().collect::<Vec<i64>>());
}

#[tokio::test]
async fn boost_sink_applies_only_high_intent_kinds() {
    let store = Arc::new(MemoryStore::default());
    let sink = SessionBoostSink::new(
        SessionBoostBucket::new(store.clone()),
        Arc::new(StaticReviews),
    );

    sink.handle(EventRecord::new(7, "click", "book", 5)).await;
    sink.handle(EventRecord::new(7, "wishlist_add", "book", 5)).await;
    sink.handle(EventRecord::new(7, "bookmark", "book", 5)).await;
    sink.handle(EventRecord::new(7, "review_create", "review", 900))
        .await;

    let bucket = SessionBoostBucket::new(store);
    let boosts = bucket.boosts_for(7).await.unwrap();

    let by_id: HashMap<i64, f64> = boosts.into_iter().collect();
    assert_eq!(by_id.len(), 2);
    assert!((by_id[&5] - 0.25).abs() < 1e-9, "wishlist 0.20 + bookmark 0.05");
    assert!((by_id[&355] - 0.05).abs() < 1e-9, "review_create on book 355");
}

#[tokio::test]
async fn recommendations_survive_a_search_outage() {
    let engine = RecommendationEngine::new(
        Arc::new(StaticGraph),
        Arc::new(DownIndex),
        Arc::new(MemoryStore::default()),
    );

    let books = engine.recommend_books(7, 10, unshuffled()).await;
    assert!(!books.is_empty());
    assert!(books.iter().any(|r| r.target_id == 101));

    let reviews = engine.recommend_reviews(7, 10, unshuffled()).await;
    assert!(!reviews.is_empty());
    assert!(reviews.iter().any(|r| r.target_id == 501));

    // Operations served purely by the index degrade to empty pages.
    let similar = engine.similar_books(42, 10, unshuffled()).await;
    assert!(similar.is_empty());
}

#[tokio::test]
async fn partial_sampling_pins_the_head_of_the_page() {
    let store = Arc::new(MemoryStore::default());
    let baseline = engine_over(store.clone())
        .recommend_books(7, 25, unshuffled())
        .await;

    let params = SamplingParams::new(SamplingMode::Partial, 9001)
        .with_shuffle(ShuffleConfig {
            fixed_top_n: 3,
            window_size: 0,
        });
    let sampled = engine_over(store).recommend_books(7, 25, params).await;

    assert_eq!(sampled.len(), baseline.len());
    for position in 0..3 {
        assert_eq!(sampled[position].target_id, baseline[position].target_id);
    }

    let mut baseline_tail: Vec<i64> = baseline[3..].iter().map(|r| r.target_id).collect();
    let mut sampled_tail: Vec<i64> = sampled[3..].iter().map(|r| r.target_id).collect();
    baseline_tail.sort_unstable();
    sampled_tail.sort_unstable();
    assert_eq!(baseline_tail, sampled_tail);
}

#[tokio::test]
async fn identical_seeds_reproduce_identical_pages() {
    let params = SamplingParams::new(SamplingMode::Full, 77);

    let first = engine_over(Arc::new(MemoryStore::default()))
        .recommend_books(7, 25, params)
        .await;
    let second = engine_over(Arc::new(MemoryStore::default()))
        .recommend_books(7, 25, params)
        .await;

    let first_ids: Vec<i64> = first.iter().map(|r| r.target_id).collect();
    let second_ids: Vec<i64> = second.iter().map(|r| r.target_id).collect();
    assert_eq!(first_ids, second_ids);

    let third = engine_over(Arc::new(MemoryStore::default()))
        .recommend_books(7, 25, SamplingParams::new(SamplingMode::Full, 78))
        .await;
    let third_ids: Vec<i64> = third.iter().map(|r| r.target_id).collect();
    assert_ne!(first_ids, third_ids);
}

#[tokio::test]
async fn model_order_is_recoverable_from_ranks_after_shuffling() {
    let store = Arc::new(MemoryStore::default());
    let baseline = engine_over(store.clone())
        .recommend_books(7, 25, unshuffled())
        .await;

    let mut shuffled = engine_over(store)
        .recommend_books(7, 25, SamplingParams::new(SamplingMode::Full, 5))
        .await;
    shuffled.sort_by_key(|r| r.rank);

    let baseline_ids: Vec<i64> = baseline.iter().map(|r| r.target_id).collect();
    let recovered_ids: Vec<i64> = shuffled.iter().map(|r| r.target_id).collect();
    assert_eq!(baseline_ids, recovered_ids);
}
