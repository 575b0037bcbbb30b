//! Core types and traits for the Burrow URL shortener.
//!
//! This crate provides the record model and the storage and cache contracts
//! shared by the engine, the reaper and the backend crates.

pub mod cache;
pub mod error;
pub mod key;
pub mod record;
pub mod store;

pub use cache::UrlCache;
pub use error::{CacheError, CoreError, StorageError};
pub use key::{ShortKey, KEY_ALPHABET, MAX_KEY_LENGTH};
pub use record::{NewShortUrlRecord, Owner, Page, RecordId, ShortUrlRecord, MAX_ID_LENGTH};
pub use store::RecordStore;
