//! Redis-backed counters, hashes and the server-side top-K trim.
//!
//! Affinity scores live in plain keys, session boosts and engagement
//! counters in hashes. The trim runs as a Lua script so concurrent writers
//! can never observe a half-trimmed bucket.

use super::{bounded, Result};
use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Duration;

/// Keeps the `max` highest-valued fields of a hash and deletes the rest,
/// returning how many fields were removed. Runs atomically on the server.
static TRIM_HASH_TOP_K: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local entries = redis.call('HGETALL', KEYS[1])
        local max = tonumber(ARGV[1])
        local items = {}
        for i = 1, #entries, 2 do
            items[#items + 1] = { entries[i], tonumber(entries[i + 1]) }
        end
        if #items <= max then
            return 0
        end
        table.sort(items, function(a, b) return a[2] > b[2] end)
        local removed = 0
        for i = max + 1, #items do
            redis.call('HDEL', KEYS[1], items[i][1])
            removed = removed + 1
        end
        return removed
        "#,
    )
});

/// Port over the key-value store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Additively increment a float key and refresh its TTL in one atomic
    /// round trip. Creates the key from zero when absent.
    async fn increment_key(&self, key: &str, delta: f64, ttl_seconds: i64) -> Result<()>;

    /// Additively increment one float field of a hash, creating both hash
    /// and field when absent.
    async fn increment_hash_field(&self, key: &str, field: &str, delta: f64) -> Result<()>;

    /// Reset a key's TTL.
    async fn refresh_ttl(&self, key: &str, ttl_seconds: i64) -> Result<()>;

    /// Atomically drop all but the `max_entries` highest-valued fields of a
    /// hash, returning the number of removed fields.
    async fn trim_hash_top_k(&self, key: &str, max_entries: usize) -> Result<u64>;

    /// Read a whole hash.
    async fn read_hash(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Read many keys at once; a missing key reads as `None`.
    async fn read_keys(&self, keys: &[String]) -> Result<Vec<Option<String>>>;
}

/// Production [`KeyValueStore`] over a Redis client.
pub struct RedisStore {
    client: redis::Client,
    call_timeout: Duration,
}

impl RedisStore {
    pub fn new(url: &str, call_timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("failed to create Redis client")?;
        Ok(Self {
            client,
            call_timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn increment_key(&self, key: &str, delta: f64, ttl_seconds: i64) -> Result<()> {
        bounded("increment_key", self.call_timeout, async {
            let mut conn = self.connection().await?;
            let mut pipe = redis::pipe();
            pipe.atomic();
            pipe.incr(key, delta).ignore();
            pipe.expire(key, ttl_seconds).ignore();
            let _: () = pipe.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn increment_hash_field(&self, key: &str, field: &str, delta: f64) -> Result<()> {
        bounded("increment_hash_field", self.call_timeout, async {
            let mut conn = self.connection().await?;
            let _: f64 = conn.hincr(key, field, delta).await?;
            Ok(())
        })
        .await
    }

    async fn refresh_ttl(&self, key: &str, ttl_seconds: i64) -> Result<()> {
        bounded("refresh_ttl", self.call_timeout, async {
            let mut conn = self.connection().await?;
            let _: () = conn.expire(key, ttl_seconds).await?;
            Ok(())
        })
        .await
    }

    async fn trim_hash_top_k(&self, key: &str, max_entries: usize) -> Result<u64> {
        bounded("trim_hash_top_k", self.call_timeout, async {
            let mut conn = self.connection().await?;
            let removed: u64 = TRIM_HASH_TOP_K
                .key(key)
                .arg(max_entries)
                .invoke_async(&mut conn)
                .await?;
            Ok(removed)
        })
        .await
    }

    async fn read_hash(&self, key: &str) -> Result<HashMap<String, String>> {
        bounded("read_hash", self.call_timeout, async {
            let mut conn = self.connection().await?;
            let entries: HashMap<String, String> = conn.hgetall(key).await?;
            Ok(entries)
        })
        .await
    }

    async fn read_keys(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        bounded("read_keys", self.call_timeout, async {
            let mut conn = self.connection().await?;
            let values: Vec<Option<String>> = conn.mget(keys).await?;
            Ok(values)
        })
        .await
    }
}
