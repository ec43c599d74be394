use super::SamplingStrategy;
use crate::models::{RankedResult, ShuffleConfig};
use rand::RngCore;

/// Pass-through strategy; the page stays in model order.
pub struct NoShuffle;

impl SamplingStrategy for NoShuffle {
    fn sample(
        &self,
        results: &[RankedResult],
        _config: &ShuffleConfig,
        _rng: &mut dyn RngCore,
    ) -> Vec<RankedResult> {
        results.to_vec()
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
