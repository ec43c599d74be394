//! Recommendation orchestration.
//!
//! Wires the candidate sources, blending, affinity read-back and sampling
//! into the operations the API layer calls. Every operation returns a
//! plain list; infrastructure failures along the way cost results, never
//! errors.

use crate::clients::{GraphStore, KeyValueStore, SearchIndex};
use crate::models::{BookSource, RankedResult, ReviewSource, SamplingParams};
use crate::services::blending::{blend, sort_and_rank};
use crate::services::candidates::{
    gather, CandidateSource, GraphBookSource, GraphReviewSource, SearchBookSource,
    SearchReviewSource,
};
use crate::services::sampling::strategy_for;
use crate::services::tracking::AffinityCache;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::warn;

/// Knobs for the orchestration layer. Defaults are the production values;
/// deployments override through configuration.
#[derive(Debug, Clone)]
pub struct EngineTuning {
    /// Multiplier folding stored affinity into blended scores.
    pub affinity_blend_weight: f64,
    /// Share of the review limit served from similar readers.
    pub similar_reader_ratio: f64,
    /// Seed books for the book-affinity review walk.
    pub book_seed_limit: usize,
    /// TTL applied to affinity entries on write.
    pub affinity_ttl_seconds: i64,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            affinity_blend_weight: 0.1,
            similar_reader_ratio: 0.5,
            book_seed_limit: 5,
            affinity_ttl_seconds: crate::services::tracking::DEFAULT_AFFINITY_TTL_SECONDS,
        }
    }
}

pub struct RecommendationEngine {
    book_graph: Arc<GraphBookSource>,
    book_search: Arc<SearchBookSource>,
    review_graph: Arc<GraphReviewSource>,
    review_search: Arc<SearchReviewSource>,
    affinity: AffinityCache,
    affinity_blend_weight: f64,
}

impl RecommendationEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::with_tuning(graph, index, store, EngineTuning::default())
    }

    pub fn with_tuning(
        graph: Arc<dyn GraphStore>,
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn KeyValueStore>,
        tuning: EngineTuning,
    ) -> Self {
        Self {
            book_graph: Arc::new(GraphBookSource::new(graph.clone())),
            book_search: Arc::new(SearchBookSource::new(index.clone())),
            review_graph: Arc::new(
                GraphReviewSource::new(graph)
                    .with_tuning(tuning.similar_reader_ratio, tuning.book_seed_limit),
            ),
            review_search: Arc::new(SearchReviewSource::new(index)),
            affinity: AffinityCache::new(store).with_ttl(tuning.affinity_ttl_seconds),
            affinity_blend_weight: tuning.affinity_blend_weight,
        }
    }

    /// Personalized book recommendations for a user.
    pub async fn recommend_books(
        &self,
        user_id: i64,
        limit: usize,
        sampling: SamplingParams,
    ) -> Vec<RankedResult> {
        if limit == 0 {
            return Vec::new();
        }

        let sources: Vec<Arc<dyn CandidateSource<BookSource>>> =
            vec![self.book_graph.clone(), self.book_search.clone()];
        let lists = gather(&sources, user_id, limit).await;

        let mut results = blend(lists);
        self.apply_affinity_boost(user_id, &mut results).await;
        results.truncate(limit);
        self.sample(results, sampling)
    }

    /// Personalized review recommendations for a user.
    pub async fn recommend_reviews(
        &self,
        user_id: i64,
        limit: usize,
        sampling: SamplingParams,
    ) -> Vec<RankedResult> {
        if limit == 0 {
            return Vec::new();
        }

        let sources: Vec<Arc<dyn CandidateSource<ReviewSource>>> =
            vec![self.review_graph.clone(), self.review_search.clone()];
        let lists = gather(&sources, user_id, limit).await;

        let mut results = blend(lists);
        results.truncate(limit);
        self.sample(results, sampling)
    }

    /// Books similar to the one being viewed.
    pub async fn similar_books(
        &self,
        book_id: i64,
        limit: usize,
        sampling: SamplingParams,
    ) -> Vec<RankedResult> {
        if limit == 0 {
            return Vec::new();
        }

        let candidates = match self.book_search.more_like_this(book_id, limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(book_id, error = %err, "similar-books lookup failed");
                Vec::new()
            }
        };

        let mut results = blend(vec![candidates]);
        results.truncate(limit);
        self.sample(results, sampling)
    }

    /// Top reviews for one book's detail page.
    pub async fn reviews_for_book(
        &self,
        book_id: i64,
        limit: usize,
        sampling: SamplingParams,
    ) -> Vec<RankedResult> {
        if limit == 0 {
            return Vec::new();
        }

        let candidates = match self.review_search.for_book(book_id, limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(book_id, error = %err, "book review lookup failed");
                Vec::new()
            }
        };

        let mut results = blend(vec![candidates]);
        results.truncate(limit);
        self.sample(results, sampling)
    }

    /// Free-text book search, ranked by relevance and never shuffled.
    pub async fn search_books(&self, query: &str, limit: usize) -> Vec<RankedResult> {
        if limit == 0 {
            return Vec::new();
        }

        let candidates = match self.book_search.semantic(query, limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(query, error = %err, "book search failed");
                Vec::new()
            }
        };

        let mut results = blend(vec![candidates]);
        results.truncate(limit);
        results
    }

    /// Fold stored affinity into the blended scores and re-rank. A failed
    /// read leaves the unboosted ranking in place.
    async fn apply_affinity_boost(&self, user_id: i64, results: &mut Vec<RankedResult>) {
        if results.is_empty() || self.affinity_blend_weight == 0.0 {
            return;
        }

        let targets: Vec<i64> = results.iter().map(|r| r.target_id).collect();
        match self.affinity.scores_for(user_id, &targets).await {
            Ok(scores) if !scores.is_empty() => {
                for result in results.iter_mut() {
                    if let Some(affinity) = scores.get(&result.target_id) {
                        result.score += affinity * self.affinity_blend_weight;
                    }
                }
                sort_and_rank(results);
            }
            Ok(_) => {}
            Err(err) => {
                warn!(user_id, error = %err, "affinity read-back failed, serving unboosted ranking");
            }
        }
    }

    fn sample(&self, results: Vec<RankedResult>, params: SamplingParams) -> Vec<RankedResult> {
        let strategy = strategy_for(params.mode);
        let mut rng = StdRng::seed_from_u64(params.seed);
        strategy.sample(&results, &params.shuffle, &mut rng)
    }
}
