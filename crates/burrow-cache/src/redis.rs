use async_trait::async_trait;
use burrow_core::cache::Result;
use burrow_core::{CacheError, ShortKey, ShortUrlRecord, UrlCache};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

const DEFAULT_KEY_PREFIX: &str = "burrow:url:";

/// A Redis-based implementation of [`UrlCache`].
///
/// This implementation stores URL records as JSON strings in Redis,
/// using a configurable key prefix. Every write carries a millisecond
/// expiry so Redis evicts the entry on its own.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") {
        CacheError::Timeout(message)
    } else if lowered.contains("connection refused") || lowered.contains("broken pipe") {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisUrlCache {
    /// Creates a new Redis URL cache.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis URL cache with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `key_prefix` - Custom prefix for cache keys (e.g., "myapp:url:")
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a multiplexed connection to `url` and wraps it.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    fn cache_key(&self, key: &ShortKey) -> String {
        format!("{}{}", self.key_prefix, key.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get_url(&self, key: &ShortKey) -> Result<Option<ShortUrlRecord>> {
        let cache_key = self.cache_key(key);
        trace!(key = %key, "Fetching URL record from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&cache_key).await {
            Ok(Some(cached)) => {
                debug!(key = %key, "Cache hit in Redis");
                match serde_json::from_str::<ShortUrlRecord>(&cached) {
                    Ok(record) => Ok(Some(record)),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Failed to deserialize cached record");
                        Err(CacheError::InvalidData(format!(
                            "invalid cached value for key '{cache_key}': {e}"
                        )))
                    }
                }
            }
            Ok(None) => {
                trace!(key = %key, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set_url(&self, key: &ShortKey, record: &ShortUrlRecord, ttl: Duration) -> Result<()> {
        let cache_key = self.cache_key(key);
        trace!(key = %key, ttl_secs = ttl.as_secs(), "Storing URL record in Redis cache");

        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize record for caching");
                return Err(CacheError::Serialization(format!(
                    "failed to serialize cache value: {e}"
                )));
            }
        };

        // PSETEX rejects a zero expiry.
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.conn.clone();
        match conn.pset_ex::<_, _, ()>(&cache_key, json, ttl_ms).await {
            Ok(()) => {
                debug!(key = %key, ttl_ms, "Cached record in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache record in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, key: &ShortKey) -> Result<()> {
        let cache_key = self.cache_key(key);
        trace!(key = %key, "Removing URL record from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&cache_key).await {
            Ok(()) => {
                debug!(key = %key, "Removed record from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to remove record from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}
