use event_schema::{EventKind, EventRecord};

/// Affinity score deltas per event kind.
///
/// Discrete interactions carry a fixed weight; dwell and scroll scale with
/// their reported magnitude up to a cap. Kinds outside this table weigh
/// zero and produce no affinity write at all.
#[derive(Debug, Clone)]
pub struct EventWeights {
    pub impression: f64,
    pub click: f64,
    pub like: f64,
    pub follow: f64,
    pub bookmark: f64,
    pub review_create: f64,
    pub review_update: f64,
    pub dwell_per_ms: f64,
    pub dwell_max: f64,
    pub scroll_per_pct: f64,
    pub scroll_max: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            impression: 0.05,
            click: 0.2,
            like: 0.3,
            follow: 0.4,
            bookmark: 0.5,
            review_create: 1.0,
            review_update: 0.5,
            dwell_per_ms: 0.001,
            dwell_max: 1.5,
            scroll_per_pct: 0.005,
            scroll_max: 0.5,
        }
    }
}

impl EventWeights {
    /// Score delta for one event. Missing or unparseable dwell and scroll
    /// magnitudes read as zero.
    pub fn weight_for(&self, kind: EventKind, event: &EventRecord) -> f64 {
        match kind {
            EventKind::Impression => self.impression,
            EventKind::Click => self.click,
            EventKind::Like => self.like,
            EventKind::Follow => self.follow,
            EventKind::Bookmark => self.bookmark,
            EventKind::ReviewCreate => self.review_create,
            EventKind::ReviewUpdate => self.review_update,
            EventKind::Dwell => {
                let dwell_ms = event.metadata_number("dwell_ms").unwrap_or(0.0);
                (dwell_ms * self.dwell_per_ms).clamp(0.0, self.dwell_max)
            }
            EventKind::Scroll => {
                let depth_pct = event.metadata_number("scroll_depth_pct").unwrap_or(0.0);
                (depth_pct * self.scroll_per_pct).clamp(0.0, self.scroll_max)
            }
            // Wishlist adds only matter to session boosts, not long-term
            // affinity.
            EventKind::WishlistAdd => 0.0,
        }
    }
}
