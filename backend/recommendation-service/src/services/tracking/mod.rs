//! Affinity tracking: behavior events in, per-user interest scores out.

mod affinity;
mod handler;
mod weights;

pub use affinity::{AffinityCache, DEFAULT_AFFINITY_TTL_SECONDS};
pub use handler::AffinityTrackingSink;
pub use weights::EventWeights;

pub(crate) use handler::resolve_book_target;
