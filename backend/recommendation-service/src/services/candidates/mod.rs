//! Pluggable candidate generation.
//!
//! Each source proposes scored targets from one backing store. Sources are
//! fanned out concurrently and a failing source simply contributes nothing;
//! the page that reaches the user is whatever the healthy sources produced.

mod graph_books;
mod graph_reviews;
mod search_books;
mod search_reviews;

pub use graph_books::GraphBookSource;
pub use graph_reviews::GraphReviewSource;
pub use search_books::SearchBookSource;
pub use search_reviews::SearchReviewSource;

use crate::models::{Candidate, SourceLabel};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

/// One candidate generator.
///
/// `limit` is the total number of candidates the caller wants from this
/// source; sources with several internal strategies split it themselves.
#[async_trait]
pub trait CandidateSource<S: SourceLabel>: Send + Sync {
    async fn generate(&self, user_id: i64, limit: usize) -> Result<Vec<Candidate<S>>>;

    fn name(&self) -> &'static str;
}

/// Run every source concurrently and collect the lists that succeeded.
pub async fn gather<S: SourceLabel>(
    sources: &[Arc<dyn CandidateSource<S>>],
    user_id: i64,
    limit: usize,
) -> Vec<Vec<Candidate<S>>> {
    let calls = sources.iter().map(|source| {
        let source = Arc::clone(source);
        async move {
            let outcome = source.generate(user_id, limit).await;
            (source.name(), outcome)
        }
    });

    let mut lists = Vec::with_capacity(sources.len());
    for (name, outcome) in join_all(calls).await {
        match outcome {
            Ok(candidates) => lists.push(candidates),
            Err(err) => warn!(source = name, error = %err, "candidate source failed, skipping"),
        }
    }
    lists
}
