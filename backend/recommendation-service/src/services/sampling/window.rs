use super::SamplingStrategy;
use crate::models::{RankedResult, ShuffleConfig};
use rand::seq::SliceRandom;
use rand::RngCore;

pub(crate) const DEFAULT_WINDOW: usize = 8;

/// Shuffles within consecutive fixed-size windows, so an item never drifts
/// more than a window away from its rank. The final window may be short.
pub struct WindowShuffle;

impl SamplingStrategy for WindowShuffle {
    fn sample(
        &self,
        results: &[RankedResult],
        config: &ShuffleConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<RankedResult> {
        let window = if config.window_size == 0 {
            DEFAULT_WINDOW
        } else {
            config.window_size
        };

        let mut page = results.to_vec();
        for chunk in page.chunks_mut(window) {
            chunk.shuffle(rng);
        }
        page
    }

    fn name(&self) -> &'static str {
        "window"
    }
}
