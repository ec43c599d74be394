use serde::{Deserialize, Serialize};

/// Candidate source tag that renders as a stable wire label
pub trait SourceLabel: Copy + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;
}

/// Book candidate origins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSource {
    GraphCollaborative,
    GraphGenre,
    GraphAuthor,
    GraphTopic,
    SearchSemantic,
    SearchMoreLikeThis,
    SearchPopularity,
}

impl SourceLabel for BookSource {
    fn as_str(&self) -> &'static str {
        match self {
            BookSource::GraphCollaborative => "graph_collaborative",
            BookSource::GraphGenre => "graph_genre",
            BookSource::GraphAuthor => "graph_author",
            BookSource::GraphTopic => "graph_topic",
            BookSource::SearchSemantic => "search_semantic",
            BookSource::SearchMoreLikeThis => "search_more_like_this",
            BookSource::SearchPopularity => "search_popularity",
        }
    }
}

/// Review candidate origins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewSource {
    GraphSimilarUser,
    GraphBookAffinity,
    SearchPopularity,
    SearchRecent,
    BookScopedPopular,
}

impl SourceLabel for ReviewSource {
    fn as_str(&self) -> &'static str {
        match self {
            ReviewSource::GraphSimilarUser => "graph_similar_user",
            ReviewSource::GraphBookAffinity => "graph_book_affinity",
            ReviewSource::SearchPopularity => "search_popularity",
            ReviewSource::SearchRecent => "search_recent",
            ReviewSource::BookScopedPopular => "book_scoped_popular",
        }
    }
}

/// A single source-tagged recommendation suggestion.
///
/// Built transiently per request and never persisted. The initial score is
/// normalized to `[0, 1]` at construction so downstream blending can assume
/// comparable magnitudes across sources.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate<S> {
    pub target_id: i64,
    pub source: S,
    pub initial_score: f64,
    pub reason: String,
}

impl<S> Candidate<S> {
    pub fn new(target_id: i64, source: S, initial_score: f64, reason: impl Into<String>) -> Self {
        Self {
            target_id,
            source,
            initial_score: initial_score.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }
}

pub type BookCandidate = Candidate<BookSource>;
pub type ReviewCandidate = Candidate<ReviewSource>;

/// Blended, ranked output row returned to callers.
///
/// `rank` is 1-based and assigned on the score-sorted order. Samplers may
/// permute the returned list but never rewrite `rank`, so the pre-shuffle
/// position stays recoverable.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub target_id: i64,
    pub score: f64,
    pub rank: u32,
    pub source: &'static str,
    pub reason: String,
}

/// Sampler tuning supplied by the caller per request
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShuffleConfig {
    /// Leading positions pinned in place by the partial strategy
    pub fixed_top_n: usize,
    /// Window width for the windowed strategy, 0 means default
    pub window_size: usize,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            fixed_top_n: 3,
            window_size: 8,
        }
    }
}

/// Diversity sampling strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    None,
    Partial,
    Window,
    Full,
}

/// Per-request sampling parameters: strategy, tuning and the seed that makes
/// the reordering reproducible across pages of the same session
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub mode: SamplingMode,
    pub shuffle: ShuffleConfig,
    pub seed: u64,
}

impl SamplingParams {
    pub fn new(mode: SamplingMode, seed: u64) -> Self {
        Self {
            mode,
            shuffle: ShuffleConfig::default(),
            seed,
        }
    }

    pub fn with_shuffle(mut self, shuffle: ShuffleConfig) -> Self {
        self.shuffle = shuffle;
        self
    }
}

/// Per-item engagement counters read from the key-value store
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngagementStats {
    pub impressions: u64,
    pub reaches: u64,
    pub clicks: u64,
    pub dwell_ms_sum: u64,
    pub dwell_count: u64,
}

impl EngagementStats {
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            return 0.0;
        }
        self.clicks as f64 / self.impressions as f64
    }

    pub fn reach_rate(&self) -> f64 {
        if self.impressions == 0 {
            return 0.0;
        }
        self.reaches as f64 / self.impressions as f64
    }

    pub fn avg_dwell_ms(&self) -> f64 {
        if self.dwell_count == 0 {
            return 0.0;
        }
        self.dwell_ms_sum as f64 / self.dwell_count as f64
    }
}
