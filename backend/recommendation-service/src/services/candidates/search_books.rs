//! Search-index book candidates.
//!
//! Covers the non-personalized strategies: engagement-weighted popularity
//! as the default feed filler, more-like-this for book detail pages and
//! free-text relevance for search.

use super::CandidateSource;
use crate::clients::{BookDocument, SearchIndex};
use crate::models::{BookCandidate, BookSource, Candidate};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Flat score for more-like-this matches; textual similarity alone is a
/// good but not top-shelf signal.
const MORE_LIKE_THIS_SCORE: f64 = 0.7;
/// Flat score for free-text relevance matches.
const SEMANTIC_SCORE: f64 = 0.6;
/// Divisor mapping the log-scaled engagement weight into [0, 1].
const POPULARITY_LOG_RANGE: f64 = 4.0;

pub struct SearchBookSource {
    index: Arc<dyn SearchIndex>,
}

impl SearchBookSource {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Engagement-weighted popularity, log-compressed so runaway titles do
    /// not flatten everything else:
    /// `min(1, log10(views + wishlists * 5 + reviews * 3 + 1) / 4)`.
    fn popularity_score(doc: &BookDocument) -> f64 {
        let weighted = doc.view_count as f64
            + doc.wishlist_count as f64 * 5.0
            + doc.review_count as f64 * 3.0;
        ((weighted + 1.0).log10() / POPULARITY_LOG_RANGE).min(1.0)
    }

    /// Books textually close to the given one.
    pub async fn more_like_this(&self, book_id: i64, limit: usize) -> Result<Vec<BookCandidate>> {
        let docs = self.index.similar_books(book_id, limit as i64).await?;
        Ok(docs
            .into_iter()
            .map(|doc| {
                Candidate::new(
                    doc.id,
                    BookSource::SearchMoreLikeThis,
                    MORE_LIKE_THIS_SCORE,
                    "similar in theme and style",
                )
            })
            .collect())
    }

    /// Free-text matches for a search query.
    pub async fn semantic(&self, text: &str, limit: usize) -> Result<Vec<BookCandidate>> {
        let docs = self.index.search_books(text, limit as i64).await?;
        Ok(docs
            .into_iter()
            .map(|doc| {
                Candidate::new(
                    doc.id,
                    BookSource::SearchSemantic,
                    SEMANTIC_SCORE,
                    "matches your search",
                )
            })
            .collect())
    }
}

#[async_trait]
impl CandidateSource<BookSource> for SearchBookSource {
    async fn generate(&self, _user_id: i64, limit: usize) -> Result<Vec<BookCandidate>> {
        let docs = self.index.popular_books(limit as i64).await?;
        Ok(docs
            .into_iter()
            .map(|doc| {
                let score = Self::popularity_score(&doc);
                Candidate::new(
                    doc.id,
                    BookSource::SearchPopularity,
                    score,
                    "popular across Folio",
                )
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "search_books"
    }
}
