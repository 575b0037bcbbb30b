//! Cache tier implementations for Burrow.
//!
//! Both backends implement [`burrow_core::UrlCache`] and honour the TTL passed
//! on every write.

pub mod moka;
pub mod redis;

pub use burrow_core::{CacheError, UrlCache};
pub use self::moka::{MokaCacheConfig, MokaUrlCache};
pub use self::redis::RedisUrlCache;
