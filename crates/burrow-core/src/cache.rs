use crate::error::CacheError;
use crate::key::ShortKey;
use crate::record::ShortUrlRecord;
use async_trait::async_trait;
use std::time::Duration;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache for short URL records.
///
/// This trait provides a domain-specific caching abstraction for
/// [`ShortUrlRecord`]s, using [`ShortKey`] as the key. The cache is a derived
/// view of the record store and never holds data the store does not.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get a record from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, key: &ShortKey) -> Result<Option<ShortUrlRecord>>;

    /// Store a record in cache, expiring it after `ttl`.
    async fn set_url(&self, key: &ShortKey, record: &ShortUrlRecord, ttl: Duration)
        -> Result<()>;

    /// Remove a record from cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, key: &ShortKey) -> Result<()>;
}
