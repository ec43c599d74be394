//! Store-facing client ports and their production drivers.
//!
//! Every backing store sits behind a small trait so the recommendation
//! layers can be exercised against mocks. Drivers wrap each remote call in
//! a timeout; a slow store degrades into an error the caller can absorb
//! instead of stalling a whole recommendation page.

mod graph;
mod kv;
mod reviews;
mod search;

pub use graph::{GraphStore, Neo4jGraphStore, SimilarReaderReview};
pub use kv::{KeyValueStore, RedisStore};
pub use reviews::{HttpReviewClient, ReviewLookup, ReviewRecord};
pub use search::{BookDocument, ElasticsearchIndex, ReviewDocument, SearchIndex};

#[cfg(test)]
pub use graph::MockGraphStore;
#[cfg(test)]
pub use kv::MockKeyValueStore;
#[cfg(test)]
pub use reviews::MockReviewLookup;
#[cfg(test)]
pub use search::MockSearchIndex;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the store clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("graph store error: {0}")]
    Graph(#[from] neo4rs::Error),
    #[error("search index error: {0}")]
    Search(#[from] elasticsearch::Error),
    #[error("key-value store error: {0}")]
    KeyValue(#[from] redis::RedisError),
    #[error("review lookup error: {0}")]
    Lookup(#[from] reqwest::Error),
    #[error("review {0} not found")]
    ReviewNotFound(i64),
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Run one store call under a deadline.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ClientError::Timeout { operation, timeout }),
    }
}
