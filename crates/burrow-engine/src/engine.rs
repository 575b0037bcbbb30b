use crate::error::{EngineError, Result};
use crate::settings::EngineSettings;
use crate::validation::{self, ShortUrlInput};
use burrow_core::{
    NewShortUrlRecord, Owner, Page, RecordId, RecordStore, ShortKey, ShortUrlRecord,
    StorageError, UrlCache,
};
use burrow_generator::KeyGenerator;
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Total number of keys tried by one create before giving up.
pub const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Owns the lifecycle rules of short URLs.
///
/// The engine composes a [`RecordStore`] (the source of truth), a
/// [`UrlCache`] (a derived read-through view used only by resolution) and a
/// [`KeyGenerator`]. Keys are claimed optimistically: an advisory lookup
/// followed by a save whose uniqueness check is authoritative, retried a
/// bounded number of times on collision.
#[derive(Debug)]
pub struct ShortUrlEngine<S, C, G> {
    store: Arc<S>,
    cache: Arc<C>,
    generator: Arc<G>,
    settings: EngineSettings,
}

impl<S, C, G> Clone for ShortUrlEngine<S, C, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            generator: Arc::clone(&self.generator),
            settings: self.settings,
        }
    }
}

impl<S: RecordStore, C: UrlCache, G: KeyGenerator> ShortUrlEngine<S, C, G> {
    /// Creates an engine, rejecting invalid settings.
    pub fn new(store: S, cache: C, generator: G, settings: EngineSettings) -> Result<Self> {
        Self::with_shared(Arc::new(store), Arc::new(cache), Arc::new(generator), settings)
    }

    /// Creates an engine over components shared with other parts of the
    /// process, such as a reaper.
    pub fn with_shared(
        store: Arc<S>,
        cache: Arc<C>,
        generator: Arc<G>,
        settings: EngineSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            store,
            cache,
            generator,
            settings,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Validates `input` and persists it under a freshly generated key.
    ///
    /// The new record is not cached; it enters the cache on first resolution.
    pub async fn create_short_url(
        &self,
        input: ShortUrlInput,
        owner: &str,
    ) -> Result<ShortUrlRecord> {
        let owner = authorize(owner)?;
        let input = validation::validate_input(input)?;

        let mut last_transient: Option<StorageError> = None;

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let key = self.generator.generate(self.settings.key_length);

            match self.store.find_by_key(&key).await {
                Ok(None) => {}
                Ok(Some(_)) => {
                    debug!(key = %key, attempt, "Generated key is held by a live record");
                    last_transient = None;
                    continue;
                }
                Err(e) if e.is_transient() => {
                    warn!(key = %key, attempt, error = %e, "Key lookup failed, retrying");
                    last_transient = Some(e);
                    continue;
                }
                Err(e) => {
                    error!(key = %key, attempt, error = %e, "Key lookup failed");
                    return Err(e.into());
                }
            }

            let record = NewShortUrlRecord {
                key,
                url: input.url.clone(),
                description: input.description.clone(),
                owner: owner.clone(),
                expires_at: Timestamp::now() + self.settings.url_ttl(),
            };

            match self.store.save(record).await {
                Ok(saved) => {
                    info!(
                        id = %saved.id,
                        key = %saved.key,
                        owner = %saved.owner,
                        attempt,
                        "Created short url"
                    );
                    return Ok(saved);
                }
                Err(StorageError::Conflict(key)) => {
                    debug!(key = %key, attempt, "Key claimed concurrently");
                    last_transient = None;
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "Save failed, retrying");
                    last_transient = Some(e);
                }
                Err(e) => {
                    error!(attempt, error = %e, "Save failed");
                    return Err(e.into());
                }
            }
        }

        match last_transient {
            Some(e) => {
                error!(attempts = MAX_CREATE_ATTEMPTS, error = %e, "Create gave up after storage failures");
                Err(e.into())
            }
            None => {
                error!(attempts = MAX_CREATE_ATTEMPTS, "Create gave up after key collisions");
                Err(EngineError::KeyExhausted {
                    attempts: MAX_CREATE_ATTEMPTS,
                })
            }
        }
    }

    /// Returns one live record owned by `owner`.
    pub async fn get_owned_record(&self, id: &str, owner: &str) -> Result<ShortUrlRecord> {
        let owner = authorize(owner)?;
        let id = validation::parse_record_id(id)?;
        self.find_owned(&id, &owner).await
    }

    /// Lists the live records of `owner`, newest first.
    pub async fn list_owned_records(
        &self,
        page: i64,
        size: i64,
        owner: &str,
    ) -> Result<Page<ShortUrlRecord>> {
        let owner = authorize(owner)?;
        let (page, size) = validation::page_request(page, size)?;
        Ok(self.store.list_by_owner(&owner, page, size).await?)
    }

    /// Deletes a record owned by `owner`, evicting its cache entry first.
    ///
    /// A cache failure does not stop the deletion.
    pub async fn delete_owned_record(&self, id: &str, owner: &str) -> Result<()> {
        let owner = authorize(owner)?;
        let id = validation::parse_record_id(id)?;
        let record = self.find_owned(&id, &owner).await?;

        if let Err(e) = self.cache.del(&record.key).await {
            warn!(id = %record.id, key = %record.key, error = %e, "Failed to evict cache entry, deleting anyway");
        }

        match self.store.delete_by_id(&record.id).await {
            Ok(deleted) => {
                info!(id = %record.id, key = %record.key, deleted, "Deleted short url");
                Ok(())
            }
            Err(e) => {
                error!(id = %record.id, key = %record.key, error = %e, "Failed to delete short url");
                Err(e.into())
            }
        }
    }

    /// Resolves a key to its live record through the cache.
    ///
    /// Cache failures are logged and never fail the resolution.
    pub async fn resolve_and_cache(&self, key: &str) -> Result<ShortUrlRecord> {
        let key = ShortKey::parse(key, self.settings.key_length)?;

        if let Some(record) = self.cached(&key).await {
            return Ok(record);
        }

        let record = self
            .store
            .find_by_key(&key)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("short url '{key}' not found")))?;

        self.populate_cache(&key, &record).await;
        Ok(record)
    }

    async fn find_owned(&self, id: &RecordId, owner: &Owner) -> Result<ShortUrlRecord> {
        self.store
            .find_by_id_for_owner(id, owner)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("short url {id} not found")))
    }

    async fn cached(&self, key: &ShortKey) -> Option<ShortUrlRecord> {
        match self.cache.get_url(key).await {
            Ok(Some(record)) if record.is_live(Timestamp::now()) => {
                debug!(key = %key, "Resolved from cache");
                Some(record)
            }
            Ok(Some(record)) => {
                debug!(key = %key, expires_at = %record.expires_at, "Evicting expired cache entry");
                if let Err(e) = self.cache.del(key).await {
                    warn!(key = %key, error = %e, "Failed to evict expired cache entry");
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, falling back to store");
                None
            }
        }
    }

    async fn populate_cache(&self, key: &ShortKey, record: &ShortUrlRecord) {
        let Some(remaining) = record.remaining_ttl(Timestamp::now()) else {
            return;
        };
        let ttl = remaining.min(self.settings.cache_ttl());

        if let Err(e) = self.cache.set_url(key, record, ttl).await {
            warn!(key = %key, error = %e, "Failed to cache resolved record");
        }
    }
}

fn authorize(owner: &str) -> Result<Owner> {
    Ok(Owner::new(owner)?)
}
