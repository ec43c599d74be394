use crate::clients::{self, KeyValueStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Affinity entries idle out after a month without reinforcement.
pub const DEFAULT_AFFINITY_TTL_SECONDS: i64 = 30 * 24 * 3600;

/// Per-user, per-book affinity scores.
///
/// One float key per (user, book) pair; every write refreshes the TTL so
/// active interests stay warm while stale ones expire on their own.
pub struct AffinityCache {
    store: Arc<dyn KeyValueStore>,
    ttl_seconds: i64,
}

impl AffinityCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl_seconds: DEFAULT_AFFINITY_TTL_SECONDS,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    fn entry_key(user_id: i64, target_id: i64) -> String {
        format!("affinity:{}:{}", user_id, target_id)
    }

    /// Additively bump one affinity entry, creating it on first touch.
    pub async fn increment(
        &self,
        user_id: i64,
        target_id: i64,
        delta: f64,
    ) -> clients::Result<()> {
        self.store
            .increment_key(&Self::entry_key(user_id, target_id), delta, self.ttl_seconds)
            .await
    }

    /// Batch-read scores for the given targets. Absent entries are simply
    /// not in the map; unparseable values are skipped.
    pub async fn scores_for(
        &self,
        user_id: i64,
        target_ids: &[i64],
    ) -> clients::Result<HashMap<i64, f64>> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = target_ids
            .iter()
            .map(|target_id| Self::entry_key(user_id, *target_id))
            .collect();
        let values = self.store.read_keys(&keys).await?;

        let mut scores = HashMap::new();
        for (target_id, value) in target_ids.iter().zip(values) {
            if let Some(raw) = value {
                if let Ok(score) = raw.parse::<f64>() {
                    scores.insert(*target_id, score);
                }
            }
        }
        Ok(scores)
    }
}
