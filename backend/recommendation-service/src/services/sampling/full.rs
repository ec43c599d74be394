use super::SamplingStrategy;
use crate::models::{RankedResult, ShuffleConfig};
use rand::seq::SliceRandom;
use rand::RngCore;

/// Fisher-Yates over the whole page; rank influences nothing. Shuffle
/// configuration is irrelevant here and deliberately ignored.
pub struct FullShuffle;

impl SamplingStrategy for FullShuffle {
    fn sample(
        &self,
        results: &[RankedResult],
        _config: &ShuffleConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<RankedResult> {
        let mut page = results.to_vec();
        page.shuffle(rng);
        page
    }

    fn name(&self) -> &'static str {
        "full"
    }
}
