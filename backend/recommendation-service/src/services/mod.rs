pub mod blending;
pub mod boost;
pub mod candidates;
pub mod engine;
pub mod sampling;
pub mod stats;
pub mod tracking;

pub use engine::RecommendationEngine;
