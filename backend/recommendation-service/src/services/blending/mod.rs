//! Candidate blending.
//!
//! Merges per-source candidate lists into one ranked page. Scores for a
//! target proposed by several sources are summed, so multi-source agreement
//! outranks a single enthusiastic source, and the outcome does not depend
//! on the order the lists arrive in. The source and reason surfaced to the
//! caller come from the highest-scoring contributor.

use crate::models::{Candidate, RankedResult, SourceLabel};
use std::cmp::Ordering;
use std::collections::HashMap;

struct MergedEntry {
    score: f64,
    best_score: f64,
    source: &'static str,
    reason: String,
}

/// Merge candidate lists into a ranked result page.
pub fn blend<S: SourceLabel>(lists: Vec<Vec<Candidate<S>>>) -> Vec<RankedResult> {
    let mut merged: HashMap<i64, MergedEntry> = HashMap::new();

    for candidate in lists.into_iter().flatten() {
        let label = candidate.source.as_str();
        match merged.get_mut(&candidate.target_id) {
            Some(entry) => {
                entry.score += candidate.initial_score;
                if candidate.initial_score > entry.best_score {
                    entry.best_score = candidate.initial_score;
                    entry.source = label;
                    entry.reason = candidate.reason;
                }
            }
            None => {
                merged.insert(
                    candidate.target_id,
                    MergedEntry {
                        score: candidate.initial_score,
                        best_score: candidate.initial_score,
                        source: label,
                        reason: candidate.reason,
                    },
                );
            }
        }
    }

    let mut results: Vec<RankedResult> = merged
        .into_iter()
        .map(|(target_id, entry)| RankedResult {
            target_id,
            score: entry.score,
            rank: 0,
            source: entry.source,
            reason: entry.reason,
        })
        .collect();

    sort_and_rank(&mut results);
    results
}

/// Sort descending by score, breaking ties by ascending target id, then
/// assign 1-based ranks. Equal-scoring inputs always land in the same order.
pub fn sort_and_rank(results: &mut [RankedResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.target_id.cmp(&b.target_id))
    });
    for (index, result) in results.iter_mut().enumerate() {
        result.rank = (index + 1) as u32;
    }
}
