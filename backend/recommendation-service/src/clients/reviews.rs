//! Internal HTTP lookup against the review service.
//!
//! Tracking needs to resolve review-scoped events down to the reviewed
//! book; this is the only cross-service call the recommendation stack
//! makes synchronously.

use super::{bounded, ClientError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// The slice of a review the tracking pipeline cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
}

/// Port for resolving a review id to its record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewLookup: Send + Sync {
    async fn review_by_id(&self, review_id: i64) -> Result<ReviewRecord>;
}

/// Production [`ReviewLookup`] over the review service's internal API.
pub struct HttpReviewClient {
    http: reqwest::Client,
    base_url: String,
    call_timeout: Duration,
}

impl HttpReviewClient {
    pub fn new(base_url: &str, call_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            call_timeout,
        }
    }

    fn endpoint(&self, review_id: i64) -> String {
        format!("{}/internal/reviews/{}", self.base_url, review_id)
    }
}

#[async_trait]
impl ReviewLookup for HttpReviewClient {
    async fn review_by_id(&self, review_id: i64) -> Result<ReviewRecord> {
        let url = self.endpoint(review_id);
        bounded("review_by_id", self.call_timeout, async {
            let response = self.http.get(&url).send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(ClientError::ReviewNotFound(review_id));
            }
            let record = response.error_for_status()?.json::<ReviewRecord>().await?;
            Ok(record)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let client = HttpReviewClient::new("http://reviews:8080/", Duration::from_secs(1));
        assert_eq!(
            client.endpoint(42),
            "http://reviews:8080/internal/reviews/42"
        );
    }
}
