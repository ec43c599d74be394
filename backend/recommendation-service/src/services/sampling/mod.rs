//! Diversity sampling over ranked pages.
//!
//! Strategies reorder an already-ranked page to keep repeat visits from
//! looking identical. All of them leave the input untouched and return a
//! fresh list, and none of them rewrite scores or ranks; a caller can
//! always recover the model ordering by sorting on `rank`. Randomness
//! comes exclusively from the caller-supplied generator, so a fixed seed
//! reproduces the exact page.

mod full;
mod identity;
mod partial;
mod window;

pub use full::FullShuffle;
pub use identity::NoShuffle;
pub use partial::PartialShuffle;
pub use window::WindowShuffle;

use crate::models::{RankedResult, SamplingMode, ShuffleConfig};
use rand::RngCore;

/// A post-ranking reordering strategy.
pub trait SamplingStrategy: Send + Sync {
    fn sample(
        &self,
        results: &[RankedResult],
        config: &ShuffleConfig,
        rng: &mut dyn RngCore,
    ) -> Vec<RankedResult>;

    fn name(&self) -> &'static str;
}

/// Resolve a configured mode to its strategy.
pub fn strategy_for(mode: SamplingMode) -> Box<dyn SamplingStrategy> {
    match mode {
        SamplingMode::None => Box::new(NoShuffle),
        SamplingMode::Partial => Box::new(PartialShuffle),
        SamplingMode::Window => Box::new(WindowShuffle),
        SamplingMode::Full => Box::new(FullShuffle),
    }
}
