//! Elasticsearch-backed catalog and review index queries.
//!
//! The book and review indices are populated by the catalog ETL; this
//! client only reads. Query failures and non-success responses degrade to
//! empty pages so a flaky index never takes recommendations down with it.

use super::{bounded, Result};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::{Elasticsearch, SearchParts};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// A book document as the catalog ETL writes it into the index.
#[derive(Debug, Clone, Deserialize)]
pub struct BookDocument {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub wishlist_count: u64,
    #[serde(default)]
    pub review_count: u64,
}

/// A review document with the engagement counters used for scoring.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDocument {
    pub id: i64,
    pub book_id: i64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub bookmark_count: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Read-side port over the search indices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Books ordered by aggregate engagement.
    async fn popular_books(&self, limit: i64) -> Result<Vec<BookDocument>>;

    /// Books textually similar to the given one.
    async fn similar_books(&self, book_id: i64, limit: i64) -> Result<Vec<BookDocument>>;

    /// Free-text book search over titles, authors, genres and descriptions.
    async fn search_books(&self, text: &str, limit: i64) -> Result<Vec<BookDocument>>;

    /// Public reviews ordered by like count.
    async fn reviews_by_likes(&self, limit: i64) -> Result<Vec<ReviewDocument>>;

    /// Public reviews ordered by creation time, newest first.
    async fn recent_reviews(&self, limit: i64) -> Result<Vec<ReviewDocument>>;

    /// Public reviews of one book, most liked first.
    async fn public_reviews_for_book(&self, book_id: i64, limit: i64)
        -> Result<Vec<ReviewDocument>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    hits: InnerHits<T>,
}

#[derive(Debug, Deserialize)]
struct InnerHits<T> {
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(rename = "_source")]
    source: Option<T>,
}

/// Production [`SearchIndex`] over the Elasticsearch HTTP transport.
pub struct ElasticsearchIndex {
    client: Elasticsearch,
    book_index: String,
    review_index: String,
    call_timeout: Duration,
}

impl ElasticsearchIndex {
    pub fn new(
        url: &str,
        book_index: &str,
        review_index: &str,
        call_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let parsed = Url::parse(url).context("invalid Elasticsearch URL")?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool)
            .build()
            .context("failed to build Elasticsearch transport")?;
        info!(url = %url, book_index = %book_index, review_index = %review_index,
            "connected to search indices");
        Ok(Self {
            client: Elasticsearch::new(transport),
            book_index: book_index.to_string(),
            review_index: review_index.to_string(),
            call_timeout,
        })
    }

    async fn book_page(&self, operation: &'static str, body: Value) -> Result<Vec<BookDocument>> {
        bounded(operation, self.call_timeout, async {
            let response = self
                .client
                .search(SearchParts::Index(&[self.book_index.as_str()]))
                .body(body)
                .send()
                .await?;

            if !response.status_code().is_success() {
                warn!(status = %response.status_code(), operation, "book index query failed");
                return Ok(Vec::new());
            }

            let parsed: SearchResponse<BookDocument> = response.json().await?;
            Ok(parsed
                .hits
                .hits
                .into_iter()
                .filter_map(|hit| hit.source)
                .collect())
        })
        .await
    }

    async fn review_page(
        &self,
        operation: &'static str,
        body: Value,
    ) -> Result<Vec<ReviewDocument>> {
        bounded(operation, self.call_timeout, async {
            let response = self
                .client
                .search(SearchParts::Index(&[self.review_index.as_str()]))
                .body(body)
                .send()
                .await?;

            if !response.status_code().is_success() {
                warn!(status = %response.status_code(), operation, "review index query failed");
                return Ok(Vec::new());
            }

            let parsed: SearchResponse<ReviewDocument> = response.json().await?;
            Ok(parsed
                .hits
                .hits
                .into_iter()
                .filter_map(|hit| hit.source)
                .collect())
        })
        .await
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn popular_books(&self, limit: i64) -> Result<Vec<BookDocument>> {
        let size = limit.clamp(1, 100);
        let body = json!({
            "size": size,
            "query": {
                "function_score": {
                    "query": { "match_all": {} },
                    "script_score": {
                        "script": {
                            "source": "Math.log10(doc['view_count'].value + doc['wishlist_count'].value * 5.0 + doc['review_count'].value * 3.0 + 1.0)"
                        }
                    },
                    "boost_mode": "replace"
                }
            }
        });
        self.book_page("popular_books", body).await
    }

    async fn similar_books(&self, book_id: i64, limit: i64) -> Result<Vec<BookDocument>> {
        let size = limit.clamp(1, 100);
        let body = json!({
            "size": size,
            "query": {
                "more_like_this": {
                    "fields": ["title", "description", "genres", "authors"],
                    "like": [{ "_index": self.book_index, "_id": book_id.to_string() }],
                    "min_term_freq": 1,
                    "min_doc_freq": 1
                }
            }
        });
        self.book_page("similar_books", body).await
    }

    async fn search_books(&self, text: &str, limit: i64) -> Result<Vec<BookDocument>> {
        let size = limit.clamp(1, 100);
        let body = json!({
            "size": size,
            "query": {
                "multi_match": {
                    "query": text,
                    "fields": ["title^3", "authors^2", "genres^2", "description"],
                    "type": "best_fields"
                }
            }
        });
        self.book_page("search_books", body).await
    }

    async fn reviews_by_likes(&self, limit: i64) -> Result<Vec<ReviewDocument>> {
        let size = limit.clamp(1, 100);
        let body = json!({
            "size": size,
            "query": { "term": { "visibility": "public" } },
            "sort": [
                { "like_count": { "order": "desc" } },
                { "created_at": { "order": "desc" } }
            ]
        });
        self.review_page("reviews_by_likes", body).await
    }

    async fn recent_reviews(&self, limit: i64) -> Result<Vec<ReviewDocument>> {
        let size = limit.clamp(1, 100);
        let body = json!({
            "size": size,
            "query": { "term": { "visibility": "public" } },
            "sort": [{ "created_at": { "order": "desc" } }]
        });
        self.review_page("recent_reviews", body).await
    }

    async fn public_reviews_for_book(
        &self,
        book_id: i64,
        limit: i64,
    ) -> Result<Vec<ReviewDocument>> {
        let size = limit.clamp(1, 100);
        let body = json!({
            "size": size,
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "book_id": book_id } },
                        { "term": { "visibility": "public" } }
                    ]
                }
            },
            "sort": [{ "like_count": { "order": "desc" } }]
        });
        self.review_page("public_reviews_for_book", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_document_tolerates_sparse_source() {
        let doc: BookDocument = serde_json::from_value(json!({ "id": 12 })).unwrap();
        assert_eq!(doc.id, 12);
        assert_eq!(doc.view_count, 0);
        assert!(doc.authors.is_empty());
    }

    #[test]
    fn test_search_response_skips_sourceless_hits() {
        let raw = json!({
            "hits": {
                "hits": [
                    { "_source": { "id": 1, "title": "Dune" } },
                    { "fields": {} },
                    { "_source": { "id": 2, "title": "Hyperion" } }
                ]
            }
        });
        let parsed: SearchResponse<BookDocument> = serde_json::from_value(raw).unwrap();
        let docs: Vec<BookDocument> = parsed
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| hit.source)
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "Dune");
    }
}
