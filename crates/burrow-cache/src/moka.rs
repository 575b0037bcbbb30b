use async_trait::async_trait;
use burrow_core::cache::Result;
use burrow_core::{ShortKey, ShortUrlRecord, UrlCache};
use moka::future::Cache;
use moka::policy::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct CachedRecord {
    record: ShortUrlRecord,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedRecord> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedRecord,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedRecord,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-memory cache implementation using Moka.
///
/// Each entry carries its own TTL, so a record cached close to its expiry
/// leaves the cache no later than it leaves the store.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, CachedRecord>,
}

impl MokaUrlCache {
    /// Creates a new Moka URL cache holding at most 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a new Moka URL cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Returns a builder for creating a custom cache configuration.
    pub fn builder() -> MokaCacheConfigBuilder {
        MokaCacheConfig::builder()
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, key: &ShortKey) -> Result<Option<ShortUrlRecord>> {
        trace!(key = %key, "Fetching URL record from Moka cache");

        match self.cache.get(key.as_str()).await {
            Some(cached) => {
                debug!(key = %key, "Cache hit in Moka");
                Ok(Some(cached.record))
            }
            None => {
                trace!(key = %key, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set_url(&self, key: &ShortKey, record: &ShortUrlRecord, ttl: Duration) -> Result<()> {
        trace!(key = %key, ttl_secs = ttl.as_secs(), "Storing URL record in Moka cache");

        if ttl.is_zero() {
            self.cache.invalidate(key.as_str()).await;
            return Ok(());
        }

        let cached = CachedRecord {
            record: record.clone(),
            ttl,
        };
        self.cache.insert(key.as_str().to_owned(), cached).await;
        debug!(key = %key, "Cached record in Moka");
        Ok(())
    }

    async fn del(&self, key: &ShortKey) -> Result<()> {
        trace!(key = %key, "Removing URL record from Moka cache");

        self.cache.invalidate(key.as_str()).await;
        debug!(key = %key, "Removed record from Moka cache (if present)");
        Ok(())
    }
}

/// Configuration for creating a [`MokaUrlCache`] with custom settings.
#[derive(Debug, TypedBuilder)]
pub struct MokaCacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default = DEFAULT_MAX_CAPACITY)]
    max_capacity: u64,
}

impl From<MokaCacheConfig> for MokaUrlCache {
    fn from(config: MokaCacheConfig) -> Self {
        MokaUrlCache::with_capacity(config.max_capacity)
    }
}
