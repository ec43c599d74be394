//! Search-index review candidates.
//!
//! Popular reviews first; when the index cannot fill the limit the
//! remainder is backfilled with the newest public reviews. A book-scoped
//! variant serves review rails on book detail pages.

use super::CandidateSource;
use crate::clients::{ReviewDocument, SearchIndex};
use crate::models::{Candidate, ReviewCandidate, ReviewSource};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Divisor mapping the log-scaled engagement weight into [0, 1]. Reviews
/// accumulate far less engagement than books, so the range is tighter.
const POPULARITY_LOG_RANGE: f64 = 2.5;

pub struct SearchReviewSource {
    index: Arc<dyn SearchIndex>,
}

impl SearchReviewSource {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Weighted engagement with log-damped views, then log-compressed:
    /// `weighted = likes + comments * 2 + bookmarks * 1.5 + ln(1 + views) * 0.5`
    /// `score = min(1, log10(weighted + 1) / 2.5)`.
    fn popularity_score(doc: &ReviewDocument) -> f64 {
        let weighted = doc.like_count as f64
            + doc.comment_count as f64 * 2.0
            + doc.bookmark_count as f64 * 1.5
            + (1.0 + doc.view_count as f64).ln() * 0.5;
        ((weighted + 1.0).log10() / POPULARITY_LOG_RANGE).min(1.0)
    }

    /// Top public reviews of one book.
    pub async fn for_book(&self, book_id: i64, limit: usize) -> Result<Vec<ReviewCandidate>> {
        let docs = self
            .index
            .public_reviews_for_book(book_id, limit as i64)
            .await?;
        Ok(docs
            .into_iter()
            .map(|doc| {
                let score = Self::popularity_score(&doc);
                Candidate::new(
                    doc.id,
                    ReviewSource::BookScopedPopular,
                    score,
                    "a top review of this book",
                )
            })
            .collect())
    }
}

#[async_trait]
impl CandidateSource<ReviewSource> for SearchReviewSource {
    async fn generate(&self, _user_id: i64, limit: usize) -> Result<Vec<ReviewCandidate>> {
        let mut candidates: Vec<ReviewCandidate> =
            match self.index.reviews_by_likes(limit as i64).await {
                Ok(docs) => docs
                    .into_iter()
                    .map(|doc| {
                        let score = Self::popularity_score(&doc);
                        Candidate::new(
                            doc.id,
                            ReviewSource::SearchPopularity,
                            score,
                            "widely liked on Folio",
                        )
                    })
                    .collect(),
                Err(err) => {
                    warn!(error = %err, "popular review fetch failed");
                    Vec::new()
                }
            };

        if candidates.len() < limit {
            let seen: HashSet<i64> = candidates.iter().map(|c| c.target_id).collect();
            let needed = limit - candidates.len();
            match self.index.recent_reviews(limit as i64).await {
                Ok(docs) => {
                    candidates.extend(
                        docs.into_iter()
                            .filter(|doc| !seen.contains(&doc.id))
                            .take(needed)
                            .map(|doc| {
                                let score = Self::popularity_score(&doc);
                                Candidate::new(
                                    doc.id,
                                    ReviewSource::SearchRecent,
                                    score,
                                    "fresh off the press",
                                )
                            }),
                    );
                }
                Err(err) => warn!(error = %err, "recent review backfill failed"),
            }
        }

        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "search_reviews"
    }
}
