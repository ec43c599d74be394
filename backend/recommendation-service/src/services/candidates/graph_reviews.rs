//! Graph-driven review candidates.
//!
//! Splits the requested limit between reviews surfaced through similar
//! readers and reviews on the user's recently interacted books. The split
//! ratio and the number of seed books are tunable per deployment.

use super::CandidateSource;
use crate::clients::{self, GraphStore};
use crate::models::{Candidate, ReviewCandidate, ReviewSource};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Share of the limit that goes to similar-reader reviews by default.
const DEFAULT_SIMILAR_READER_RATIO: f64 = 0.5;
/// How many recently interacted books seed the book-affinity half.
const DEFAULT_BOOK_SEED_LIMIT: usize = 5;

/// Raw peer counts saturate the similar-reader score at this value.
const SIMILARITY_SATURATION: f64 = 5.0;
/// Score assigned when the graph returns no usable similarity signal.
const SIMILARITY_FALLBACK_SCORE: f64 = 0.5;
/// Flat score for reviews found through recently interacted books.
const BOOK_AFFINITY_SCORE: f64 = 0.6;

pub struct GraphReviewSource {
    graph: Arc<dyn GraphStore>,
    similar_reader_ratio: f64,
    book_seed_limit: usize,
}

impl GraphReviewSource {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self {
            graph,
            similar_reader_ratio: DEFAULT_SIMILAR_READER_RATIO,
            book_seed_limit: DEFAULT_BOOK_SEED_LIMIT,
        }
    }

    pub fn with_tuning(mut self, similar_reader_ratio: f64, book_seed_limit: usize) -> Self {
        self.similar_reader_ratio = similar_reader_ratio.clamp(0.0, 1.0);
        self.book_seed_limit = book_seed_limit;
        self
    }

    async fn similar_reader_reviews(
        &self,
        user_id: i64,
        limit: usize,
    ) -> clients::Result<Vec<ReviewCandidate>> {
        let rows = self
            .graph
            .reviews_by_similar_readers(user_id, limit as i64)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let score = row
                    .similarity
                    .map(|raw| (raw / SIMILARITY_SATURATION).min(1.0))
                    .unwrap_or(SIMILARITY_FALLBACK_SCORE);
                Candidate::new(
                    row.review_id,
                    ReviewSource::GraphSimilarUser,
                    score,
                    "liked by readers with similar taste",
                )
            })
            .collect())
    }

    async fn book_affinity_reviews(
        &self,
        user_id: i64,
        limit: usize,
    ) -> clients::Result<Vec<ReviewCandidate>> {
        let seeds = self
            .graph
            .recently_interacted_books(user_id, self.book_seed_limit as i64)
            .await?;
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let review_ids = self.graph.reviews_for_books(&seeds, limit as i64).await?;
        Ok(review_ids
            .into_iter()
            .map(|review_id| {
                Candidate::new(
                    review_id,
                    ReviewSource::GraphBookAffinity,
                    BOOK_AFFINITY_SCORE,
                    "on a book you recently read",
                )
            })
            .collect())
    }
}

#[async_trait]
impl CandidateSource<ReviewSource> for GraphReviewSource {
    async fn generate(&self, user_id: i64, limit: usize) -> Result<Vec<ReviewCandidate>> {
        let similar_share = (limit as f64 * self.similar_reader_ratio) as usize;
        let affinity_share = limit.saturating_sub(similar_share);

        let mut candidates = Vec::new();

        if similar_share > 0 {
            match self.similar_reader_reviews(user_id, similar_share).await {
                Ok(reviews) => candidates.extend(reviews),
                Err(err) => warn!(user_id, error = %err, "similar-reader review walk failed"),
            }
        }

        if affinity_share > 0 {
            match self.book_affinity_reviews(user_id, affinity_share).await {
                Ok(reviews) => candidates.extend(reviews),
                Err(err) => warn!(user_id, error = %err, "book-affinity review walk failed"),
            }
        }

        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "graph_reviews"
    }
}
