//! Neo4j-backed reading graph walks.
//!
//! The graph holds readers, books, authors, genres and reviews with the
//! relationships Folio accumulates from reading activity. All queries here
//! return bare ids plus the counts the candidate scoring needs; hydrating
//! titles and covers stays with the catalog services.

use super::{bounded, Result};
use anyhow::Context;
use async_trait::async_trait;
use neo4rs::{query, Graph};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A review surfaced through similar readers, with the raw peer count when
/// the graph can produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarReaderReview {
    pub review_id: i64,
    pub similarity: Option<f64>,
}

/// Read-side port over the reading graph.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Books favored by readers whose favorites overlap the user's, with the
    /// number of such peers per book.
    async fn similar_reader_favorites(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>>;

    /// Books sharing genres with the user's reading history, with the genre
    /// overlap count per book.
    async fn genre_overlap_books(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>>;

    /// Books written by authors the user already favors, with the author
    /// overlap count per book.
    async fn author_overlap_books(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>>;

    /// Books reachable from the user's history over short relationship
    /// paths, with the distinct path count per book.
    async fn related_path_books(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>>;

    /// Reviews liked by readers with taste similar to the user's.
    async fn reviews_by_similar_readers(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<SimilarReaderReview>>;

    /// The user's most recently interacted books, newest first.
    async fn recently_interacted_books(&self, user_id: i64, limit: i64) -> Result<Vec<i64>>;

    /// Reviews written on any of the given books, newest first.
    async fn reviews_for_books(&self, book_ids: &[i64], limit: i64) -> Result<Vec<i64>>;
}

/// Production [`GraphStore`] over a Neo4j bolt connection.
pub struct Neo4jGraphStore {
    graph: Arc<Graph>,
    call_timeout: Duration,
}

impl Neo4jGraphStore {
    pub async fn new(
        uri: &str,
        user: &str,
        password: &str,
        call_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;
        info!(uri = %uri, "connected to Neo4j reading graph");
        Ok(Self {
            graph: Arc::new(graph),
            call_timeout,
        })
    }

    async fn collect_counted(
        &self,
        operation: &'static str,
        cypher: &'static str,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<(i64, i64)>> {
        bounded(operation, self.call_timeout, async {
            let mut result = self
                .graph
                .execute(query(cypher).param("user_id", user_id).param("limit", limit))
                .await?;

            let mut rows = Vec::new();
            while let Some(row) = result.next().await? {
                if let Ok(book_id) = row.get::<i64>("book_id") {
                    let count: i64 = row.get("overlap").unwrap_or(0);
                    rows.push((book_id, count));
                }
            }
            Ok(rows)
        })
        .await
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn similar_reader_favorites(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>> {
        let cypher = r#"
            MATCH (me:User {id: $user_id})-[:FAVORITED]->(:Book)<-[:FAVORITED]-(peer:User),
                  (peer)-[:FAVORITED]->(rec:Book)
            WHERE peer.id <> $user_id
              AND NOT (me)-[:FAVORITED]->(rec)
            RETURN rec.id AS book_id, count(DISTINCT peer) AS overlap
            ORDER BY overlap DESC
            LIMIT $limit
        "#;
        self.collect_counted("similar_reader_favorites", cypher, user_id, limit)
            .await
    }

    async fn genre_overlap_books(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>> {
        let cypher = r#"
            MATCH (me:User {id: $user_id})-[:INTERACTED]->(:Book)-[:IN_GENRE]->(g:Genre),
                  (g)<-[:IN_GENRE]-(rec:Book)
            WHERE NOT (me)-[:INTERACTED]->(rec)
            RETURN rec.id AS book_id, count(DISTINCT g) AS overlap
            ORDER BY overlap DESC
            LIMIT $limit
        "#;
        self.collect_counted("genre_overlap_books", cypher, user_id, limit)
            .await
    }

    async fn author_overlap_books(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>> {
        let cypher = r#"
            MATCH (me:User {id: $user_id})-[:FAVORITED]->(:Book)-[:WRITTEN_BY]->(a:Author),
                  (a)<-[:WRITTEN_BY]-(rec:Book)
            WHERE NOT (me)-[:INTERACTED]->(rec)
            RETURN rec.id AS book_id, count(DISTINCT a) AS overlap
            ORDER BY overlap DESC
            LIMIT $limit
        "#;
        self.collect_counted("author_overlap_books", cypher, user_id, limit)
            .await
    }

    async fn related_path_books(&self, user_id: i64, limit: i64) -> Result<Vec<(i64, i64)>> {
        let cypher = r#"
            MATCH (me:User {id: $user_id})-[:INTERACTED]->(seed:Book),
                  p = (seed)-[*1..2]-(rec:Book)
            WHERE rec <> seed
              AND NOT (me)-[:INTERACTED]->(rec)
            RETURN rec.id AS book_id, count(p) AS overlap
            ORDER BY overlap DESC
            LIMIT $limit
        "#;
        self.collect_counted("related_path_books", cypher, user_id, limit)
            .await
    }

    async fn reviews_by_similar_readers(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<SimilarReaderReview>> {
        let cypher = r#"
            MATCH (me:User {id: $user_id})-[:LIKED]->(:Review)<-[:LIKED]-(peer:User),
                  (peer)-[:LIKED]->(r:Review)
            WHERE peer.id <> $user_id
              AND NOT (me)-[:LIKED]->(r)
            WITH r, count(DISTINCT peer) AS shared
            RETURN r.id AS review_id, toFloat(shared) AS similarity
            ORDER BY shared DESC
            LIMIT $limit
        "#;
        bounded("reviews_by_similar_readers", self.call_timeout, async {
            let mut result = self
                .graph
                .execute(query(cypher).param("user_id", user_id).param("limit", limit))
                .await?;

            let mut rows = Vec::new();
            while let Some(row) = result.next().await? {
                if let Ok(review_id) = row.get::<i64>("review_id") {
                    rows.push(SimilarReaderReview {
                        review_id,
                        similarity: row.get::<f64>("similarity").ok(),
                    });
                }
            }
            Ok(rows)
        })
        .await
    }

    async fn recently_interacted_books(&self, user_id: i64, limit: i64) -> Result<Vec<i64>> {
        let cypher = r#"
            MATCH (me:User {id: $user_id})-[i:INTERACTED]->(b:Book)
            RETURN b.id AS book_id
            ORDER BY i.last_at DESC
            LIMIT $limit
        "#;
        bounded("recently_interacted_books", self.call_timeout, async {
            let mut result = self
                .graph
                .execute(query(cypher).param("user_id", user_id).param("limit", limit))
                .await?;

            let mut rows = Vec::new();
            while let Some(row) = result.next().await? {
                if let Ok(book_id) = row.get::<i64>("book_id") {
                    rows.push(book_id);
                }
            }
            Ok(rows)
        })
        .await
    }

    async fn reviews_for_books(&self, book_ids: &[i64], limit: i64) -> Result<Vec<i64>> {
        let cypher = r#"
            MATCH (b:Book)<-[:REVIEWS]-(r:Review)
            WHERE b.id IN $book_ids
            RETURN r.id AS review_id
            ORDER BY r.created_at DESC
            LIMIT $limit
        "#;
        let book_ids = book_ids.to_vec();
        bounded("reviews_for_books", self.call_timeout, async {
            let mut result = self
                .graph
                .execute(query(cypher).param("book_ids", book_ids).param("limit", limit))
                .await?;

            let mut rows = Vec::new();
            while let Some(row) = result.next().await? {
                if let Ok(review_id) = row.get::<i64>("review_id") {
                    rows.push(review_id);
                }
            }
            Ok(rows)
        })
        .await
    }
}
