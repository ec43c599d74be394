//! Graph-driven book candidates.
//!
//! Four walks over the reading graph run concurrently, each allotted an
//! even share of the requested limit. Overlap counts are normalized into
//! scores with per-strategy saturation points tuned so that a handful of
//! agreeing signals already reads as strong.

use super::CandidateSource;
use crate::clients::{self, GraphStore};
use crate::models::{BookCandidate, BookSource, Candidate, SourceLabel};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Peer counts saturate the collaborative score at this many similar readers.
const COLLABORATIVE_SATURATION: f64 = 10.0;
/// Genre overlap saturates at this many shared genres.
const GENRE_SATURATION: f64 = 3.0;
/// Author overlap saturates at this many shared authors.
const AUTHOR_SATURATION: f64 = 2.0;
/// Path counts saturate at this many distinct connecting paths.
const TOPIC_SATURATION: f64 = 5.0;

pub struct GraphBookSource {
    graph: Arc<dyn GraphStore>,
}

impl GraphBookSource {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl CandidateSource<BookSource> for GraphBookSource {
    async fn generate(&self, user_id: i64, limit: usize) -> Result<Vec<BookCandidate>> {
        let per_query = (limit / 4).max(1) as i64;

        let (collaborative, genre, author, topical) = tokio::join!(
            self.graph.similar_reader_favorites(user_id, per_query),
            self.graph.genre_overlap_books(user_id, per_query),
            self.graph.author_overlap_books(user_id, per_query),
            self.graph.related_path_books(user_id, per_query),
        );

        let mut candidates = Vec::new();
        append_counted(
            &mut candidates,
            collaborative,
            BookSource::GraphCollaborative,
            COLLABORATIVE_SATURATION,
            "favored by readers like you",
        );
        append_counted(
            &mut candidates,
            genre,
            BookSource::GraphGenre,
            GENRE_SATURATION,
            "shares genres with your shelf",
        );
        append_counted(
            &mut candidates,
            author,
            BookSource::GraphAuthor,
            AUTHOR_SATURATION,
            "by an author you favor",
        );
        append_counted(
            &mut candidates,
            topical,
            BookSource::GraphTopic,
            TOPIC_SATURATION,
            "closely related to books you read",
        );

        Ok(dedupe_by_target(candidates))
    }

    fn name(&self) -> &'static str {
        "graph_books"
    }
}

fn append_counted(
    out: &mut Vec<BookCandidate>,
    rows: clients::Result<Vec<(i64, i64)>>,
    source: BookSource,
    saturation: f64,
    reason: &str,
) {
    match rows {
        Ok(rows) => {
            for (book_id, count) in rows {
                let score = (count as f64 / saturation).min(1.0);
                out.push(Candidate::new(book_id, source, score, reason));
            }
        }
        Err(err) => warn!(source = source.as_str(), error = %err, "graph walk failed"),
    }
}

/// First occurrence wins, so earlier strategies keep their score and reason.
fn dedupe_by_target(candidates: Vec<BookCandidate>) -> Vec<BookCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.target_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, MockGraphStore};
    use std::time::Duration;

    fn source_with(mock: MockGraphStore) -> GraphBookSource {
        GraphBookSource::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_collaborative_score_scales_with_peer_count() {
        let mut mock = MockGraphStore::new();
        mock.expect_similar_reader_favorites()
            .returning(|_, _| Ok(vec![(1, 5), (2, 25)]));
        mock.expect_genre_overlap_books().returning(|_, _| Ok(vec![]));
        mock.expect_author_overlap_books()
            .returning(|_, _| Ok(vec![]));
        mock.expect_related_path_books().returning(|_, _| Ok(vec![]));

        let candidates = source_with(mock).generate(7, 20).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert!((candidates[0].initial_score - 0.5).abs() < 1e-9);
        assert!((candidates[1].initial_score - 1.0).abs() < 1e-9);
        assert_eq!(candidates[0].source, BookSource::GraphCollaborative);
    }

    #[tokio::test]
    async fn test_genre_and_author_scores_use_their_own_saturation() {
        let mut mock = MockGraphStore::new();
        mock.expect_similar_reader_favorites()
            .returning(|_, _| Ok(vec![]));
        mock.expect_genre_overlap_books()
            .returning(|_, _| Ok(vec![(10, 2)]));
        mock.expect_author_overlap_books()
            .returning(|_, _| Ok(vec![(11, 1)]));
        mock.expect_related_path_books().returning(|_, _| Ok(vec![]));

        let candidates = source_with(mock).generate(7, 20).await.unwrap();
        let genre = candidates
            .iter()
            .find(|c| c.source == BookSource::GraphGenre)
            .unwrap();
        let author = candidates
            .iter()
            .find(|c| c.source == BookSource::GraphAuthor)
            .unwrap();
        assert!((genre.initial_score - 2.0 / 3.0).abs() < 1e-9);
        assert!((author.initial_score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_duplicate_books_keep_first_strategy() {
        let mut mock = MockGraphStore::new();
        mock.expect_similar_reader_favorites()
            .returning(|_, _| Ok(vec![(5, 10)]));
        mock.expect_genre_overlap_books()
            .returning(|_, _| Ok(vec![(5, 3)]));
        mock.expect_author_overlap_books()
            .returning(|_, _| Ok(vec![]));
        mock.expect_related_path_books().returning(|_, _| Ok(vec![]));

        let candidates = source_with(mock).generate(7, 20).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, BookSource::GraphCollaborative);
    }

    #[tokio::test]
    async fn test_one_failed_walk_leaves_the_rest_standing() {
        let mut mock = MockGraphStore::new();
        mock.expect_similar_reader_favorites().returning(|_, _| {
            Err(ClientError::Timeout {
                operation: "similar_reader_favorites",
                timeout: Duration::from_millis(100),
            })
        });
        mock.expect_genre_overlap_books()
            .returning(|_, _| Ok(vec![(10, 3)]));
        mock.expect_author_overlap_books()
            .returning(|_, _| Ok(vec![]));
        mock.expect_related_path_books().returning(|_, _| Ok(vec![]));

        let candidates = source_with(mock).generate(7, 20).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_id, 10);
    }

    #[tokio::test]
    async fn test_each_walk_gets_a_quarter_of_the_limit() {
        let mut mock = MockGraphStore::new();
        mock.expect_similar_reader_favorites()
            .withf(|_, limit| *limit == 5)
            .returning(|_, _| Ok(vec![]));
        mock.expect_genre_overlap_books()
            .withf(|_, limit| *limit == 5)
            .returning(|_, _| Ok(vec![]));
        mock.expect_author_overlap_books()
            .withf(|_, limit| *limit == 5)
            .returning(|_, _| Ok(vec![]));
        mock.expect_related_path_books()
            .withf(|_, limit| *limit == 5)
            .returning(|_, _| Ok(vec![]));

        source_with(mock).generate(7, 20).await.unwrap();
    }
}
