use async_trait::async_trait;
use burrow_core::store::{RecordStore, Result};
use burrow_core::{
    NewShortUrlRecord, Owner, Page, RecordId, ShortKey, ShortUrlRecord, StorageError,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of [`RecordStore`] using DashMap.
///
/// Records are indexed by id, with a second map from key to the id of the
/// record currently holding it. Claiming a key goes through the key map's
/// entry lock, which makes the uniqueness check and the claim atomic.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<String, ShortUrlRecord>,
    keys: DashMap<String, String>,
    next_id: AtomicU64,
}

impl InMemoryRecordStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            keys: DashMap::with_capacity(capacity),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of stored records, live or expired.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn mint(&self, record: NewShortUrlRecord, now: Timestamp) -> ShortUrlRecord {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        ShortUrlRecord {
            // fixed width keeps lexical and numeric order identical
            id: RecordId::new_unchecked(format!("{seq:024x}")),
            key: record.key,
            url: record.url,
            description: record.description,
            created_at: now,
            last_updated_by: record.owner.as_str().to_owned(),
            owner: record.owner,
            last_updated_at: now,
            expires_at: record.expires_at,
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save(&self, record: NewShortUrlRecord) -> Result<ShortUrlRecord> {
        let now = Timestamp::now();

        match self.keys.entry(record.key.as_str().to_owned()) {
            Entry::Occupied(mut holder) => {
                let held_by_live = self
                    .records
                    .get(holder.get())
                    .is_some_and(|existing| existing.is_live(now));
                if held_by_live {
                    return Err(StorageError::Conflict(record.key.to_string()));
                }

                // The expired holder stays in `records` until it is reaped.
                let stored = self.mint(record, now);
                self.records
                    .insert(stored.id.as_str().to_owned(), stored.clone());
                holder.insert(stored.id.as_str().to_owned());
                Ok(stored)
            }
            Entry::Vacant(slot) => {
                let stored = self.mint(record, now);
                self.records
                    .insert(stored.id.as_str().to_owned(), stored.clone());
                slot.insert(stored.id.as_str().to_owned());
                Ok(stored)
            }
        }
    }

    async fn find_by_id_for_owner(
        &self,
        id: &RecordId,
        owner: &Owner,
    ) -> Result<Option<ShortUrlRecord>> {
        let now = Timestamp::now();
        Ok(self
            .records
            .get(id.as_str())
            .filter(|record| record.owner == *owner && record.is_live(now))
            .map(|record| record.clone()))
    }

    async fn find_by_key(&self, key: &ShortKey) -> Result<Option<ShortUrlRecord>> {
        let now = Timestamp::now();

        let Some(id) = self.keys.get(key.as_str()).map(|holder| holder.clone()) else {
            return Ok(None);
        };

        Ok(self
            .records
            .get(&id)
            .filter(|record| record.is_live(now))
            .map(|record| record.clone()))
    }

    async fn list_by_owner(
        &self,
        owner: &Owner,
        page: u32,
        size: u32,
    ) -> Result<Page<ShortUrlRecord>> {
        let now = Timestamp::now();

        let mut owned: Vec<ShortUrlRecord> = self
            .records
            .iter()
            .filter(|entry| entry.owner == *owner && entry.is_live(now))
            .map(|entry| entry.value().clone())
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });

        let total = owned.len() as u64;
        let offset = (page as usize).saturating_mul(size as usize);
        let items = owned.into_iter().skip(offset).take(size as usize).collect();

        Ok(Page {
            items,
            page,
            size,
            total,
        })
    }

    fn find_expired(&self, now: Timestamp) -> BoxStream<'_, Result<ShortUrlRecord>> {
        // Snapshot first so callers can delete while consuming without
        // contending on shard locks held by a live iterator.
        let expired: Vec<Result<ShortUrlRecord>> = self
            .records
            .iter()
            .filter(|entry| !entry.is_live(now))
            .map(|entry| Ok(entry.value().clone()))
            .collect();

        stream::iter(expired).boxed()
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool> {
        let Some((_, removed)) = self.records.remove(id.as_str()) else {
            return Ok(false);
        };

        self.keys
            .remove_if(removed.key.as_str(), |_, holder| holder == id.as_str());
        Ok(true)
    }
}
