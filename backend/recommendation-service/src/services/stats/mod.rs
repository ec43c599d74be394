//! Read-only engagement stats.
//!
//! Counters are written by the analytics rollup jobs; this provider only
//! reads them back for ranking inputs and internal dashboards. A missing
//! hash or a mangled field reads as zero rather than an error.

use crate::clients::{self, KeyValueStore};
use crate::models::EngagementStats;
use std::collections::HashMap;
use std::sync::Arc;

pub struct EngagementStatsProvider {
    store: Arc<dyn KeyValueStore>,
}

impl EngagementStatsProvider {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn stats_key(target_id: i64) -> String {
        format!("engagement:{}", target_id)
    }

    /// Stats for one target.
    pub async fn stats_for(&self, target_id: i64) -> clients::Result<EngagementStats> {
        let raw = self.store.read_hash(&Self::stats_key(target_id)).await?;
        Ok(EngagementStats {
            impressions: parse_field(&raw, "impressions"),
            reaches: parse_field(&raw, "reaches"),
            clicks: parse_field(&raw, "clicks"),
            dwell_ms_sum: parse_field(&raw, "dwell_ms_sum"),
            dwell_count: parse_field(&raw, "dwell_count"),
        })
    }
}

fn parse_field(raw: &HashMap<String, String>, field: &str) -> u64 {
    raw.get(field)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}
