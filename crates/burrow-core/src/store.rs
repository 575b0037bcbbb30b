use crate::error::StorageError;
use crate::key::ShortKey;
use crate::record::{NewShortUrlRecord, Owner, Page, RecordId, ShortUrlRecord};
use async_trait::async_trait;
use futures::stream::BoxStream;
use jiff::Timestamp;

/// Type alias for store results.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable, queryable persistence for short URL records.
///
/// Every read except [`find_expired`](RecordStore::find_expired) only ever
/// returns live records (`expires_at > now`).
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Persists a new record, assigning its id and write timestamps.
    ///
    /// Returns `Err(StorageError::Conflict)` if a live record already holds
    /// the key. An expired holder of the same key is displaced.
    async fn save(&self, record: NewShortUrlRecord) -> Result<ShortUrlRecord>;

    /// Returns the record if it is live and owned by `owner`.
    async fn find_by_id_for_owner(
        &self,
        id: &RecordId,
        owner: &Owner,
    ) -> Result<Option<ShortUrlRecord>>;

    /// Returns the live record holding `key`, whoever owns it.
    async fn find_by_key(&self, key: &ShortKey) -> Result<Option<ShortUrlRecord>>;

    /// Lists live records of `owner`, newest first.
    async fn list_by_owner(&self, owner: &Owner, page: u32, size: u32)
        -> Result<Page<ShortUrlRecord>>;

    /// Streams every record with `expires_at <= now`, regardless of owner.
    ///
    /// The stream is consumed lazily so large backlogs are never materialised.
    fn find_expired(&self, now: Timestamp) -> BoxStream<'_, Result<ShortUrlRecord>>;

    /// Deletes a record by id. Returns `true` if the record existed.
    async fn delete_by_id(&self, id: &RecordId) -> Result<bool>;
}
