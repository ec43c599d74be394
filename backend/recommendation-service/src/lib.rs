//! Folio recommendation engine.
//!
//! Candidate generation over the reading graph and search indices,
//! blending into ranked pages, diversity sampling, and the event-driven
//! affinity and session boost pipelines behind them.

pub mod clients;
pub mod config;
pub mod consumers;
pub mod models;
pub mod producer;
pub mod services;

pub use config::Config;
pub use services::engine::{EngineTuning, RecommendationEngine};
