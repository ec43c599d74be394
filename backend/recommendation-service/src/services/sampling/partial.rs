use super::SamplingStrategy;
use crate::models::{RankedResult, ShuffleConfig};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Keeps the top `fixed_top_n` positions exactly as ranked and shuffles
/// everything after them.
pub struct PartialShuffle;

impl SamplingStrategy for PartialShuffle {
    fn sample(
        &self,
        results: &[RankedResult],
        config: &ShuffleConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<RankedResult> {
        let mut page = results.to_vec();
        if config.fixed_top_n < page.len() {
            page[config.fixed_top_n..].shuffle(rng);
        }
        page
    }

    fn name(&self) -> &'static str {
        "partial"
    }
}
