//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use dashhub_core::config::cache::MemoryCacheConfig;
use dashhub_core::result::AppResult;
use dashhub_core::traits::cache::CacheProvider;

/// Cached value together with its own time-to-live.
type Entry = (String, Duration);

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// In-memory cache provider using moka.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, Entry>,
    /// Default TTL for entries.
    default_ttl: Duration,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    ///
    /// `time_to_live_seconds` caps every entry; shorter per-entry TTLs win.
    pub fn new(config: &MemoryCacheConfig, default_ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|(value, _)| value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.cache
            .insert(key.to_string(), (value.to_string(), ttl))
            .await;
        Ok(())
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
