use crate::schedule::ReaperSchedule;
use burrow_core::{RecordStore, ShortUrlRecord, UrlCache};
use futures::StreamExt;
use jiff::Timestamp;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct ReaperSettings {
    /// A disabled reaper logs a warning on every trigger and touches nothing.
    #[builder(default = true)]
    pub enabled: bool,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Tally of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapReport {
    /// Expired records read from the store.
    pub scanned: u64,
    pub cache_evicted: u64,
    pub cache_failures: u64,
    pub store_deleted: u64,
    pub store_failures: u64,
    /// Items the store stream failed to produce.
    pub stream_errors: u64,
}

impl ReapReport {
    pub fn failures(&self) -> u64 {
        self.cache_failures + self.store_failures + self.stream_errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ReapReport),
    /// Another sweep was still running.
    Skipped,
}

/// Removes expired records from the cache tier and the store.
///
/// Per-record failures never abort a sweep; they are logged and counted in
/// the [`ReapReport`]. Clones share the single-flight guard.
#[derive(Debug)]
pub struct Reaper<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    settings: ReaperSettings,
    running: Arc<AtomicBool>,
}

impl<S, C> Clone for Reaper<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            settings: self.settings,
            running: Arc::clone(&self.running),
        }
    }
}

/// Releases the single-flight flag when dropped, including on cancellation.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: RecordStore, C: UrlCache> Reaper<S, C> {
    pub fn new(store: S, cache: C, settings: ReaperSettings) -> Self {
        Self::with_shared(Arc::new(store), Arc::new(cache), settings)
    }

    pub fn with_shared(store: Arc<S>, cache: Arc<C>, settings: ReaperSettings) -> Self {
        Self {
            store,
            cache,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Whether a sweep is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sweeps every record that expired at or before `now`.
    pub async fn run_once(&self, now: Timestamp) -> RunOutcome {
        if !self.settings.enabled {
            warn!("Expired short url cleanup is disabled");
            return RunOutcome::Completed(ReapReport::default());
        }

        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!("Previous cleanup still running, skipping this trigger");
            return RunOutcome::Skipped;
        };

        info!(now = %now, "Cleaning up expired short urls");

        let report = self
            .store
            .find_expired(now)
            .fold(ReapReport::default(), |mut report, item| async move {
                match item {
                    Ok(record) => {
                        report.scanned += 1;
                        self.reap(&record, &mut report).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable expired record");
                        report.stream_errors += 1;
                    }
                }
                report
            })
            .await;

        info!(
            scanned = report.scanned,
            cache_evicted = report.cache_evicted,
            cache_failures = report.cache_failures,
            store_deleted = report.store_deleted,
            store_failures = report.store_failures,
            stream_errors = report.stream_errors,
            "Cleanup finished"
        );
        RunOutcome::Completed(report)
    }

    async fn reap(&self, record: &ShortUrlRecord, report: &mut ReapReport) {
        match self.cache.del(&record.key).await {
            Ok(()) => report.cache_evicted += 1,
            Err(e) => {
                warn!(id = %record.id, key = %record.key, error = %e, "Failed to evict expired record from cache");
                report.cache_failures += 1;
            }
        }

        match self.store.delete_by_id(&record.id).await {
            Ok(true) => {
                debug!(id = %record.id, key = %record.key, "Deleted expired record");
                report.store_deleted += 1;
            }
            Ok(false) => {
                debug!(id = %record.id, key = %record.key, "Expired record already gone");
            }
            Err(e) => {
                warn!(id = %record.id, key = %record.key, error = %e, "Failed to delete expired record");
                report.store_failures += 1;
            }
        }
    }

    /// Sweeps on every fire time of `schedule` until `shutdown` resolves.
    ///
    /// A sweep in progress when `shutdown` resolves is dropped.
    pub async fn run<F>(&self, schedule: &ReaperSchedule, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            cron = %schedule.expression(),
            zone = %schedule.zone(),
            enabled = self.settings.enabled,
            "Reaper started"
        );

        loop {
            let Some(delay) = schedule.until_next(Timestamp::now()) else {
                warn!(cron = %schedule.expression(), "Schedule has no upcoming fire time");
                return;
            };
            debug!(delay_ms = delay.as_millis() as u64, "Waiting for next cleanup");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.run_once(Timestamp::now()) => {}
            }
        }

        info!("Reaper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use burrow_cache::MokaUrlCache;
    use burrow_core::cache::Result as CacheResult;
    use burrow_core::store::Result as StoreResult;
    use burrow_core::{
        CacheError, NewShortUrlRecord, Owner, Page, RecordId, ShortKey, StorageError,
    };
    use burrow_storage::InMemoryRecordStore;
    use futures::stream::{self, BoxStream};
    use jiff::SignedDuration;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Moka cache that refuses to evict the listed keys.
    #[derive(Debug, Default)]
    struct StickyCache {
        inner: MokaUrlCache,
        sticky: HashSet<String>,
    }

    #[async_trait]
    impl UrlCache for StickyCache {
        async fn get_url(&self, key: &ShortKey) -> CacheResult<Option<ShortUrlRecord>> {
            self.inner.get_url(key).await
        }

        async fn set_url(
            &self,
            key: &ShortKey,
            record: &ShortUrlRecord,
            ttl: Duration,
        ) -> CacheResult<()> {
            self.inner.set_url(key, record, ttl).await
        }

        async fn del(&self, key: &ShortKey) -> CacheResult<()> {
            if self.sticky.contains(key.as_str()) {
                return Err(CacheError::Timeout(format!("del {key}")));
            }
            self.inner.del(key).await
        }
    }

    /// In-memory store with scripted failures in the reaper's path.
    #[derive(Debug, Default)]
    struct ScriptedStore {
        inner: InMemoryRecordStore,
        undeletable: HashSet<String>,
        corrupt_rows: usize,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl RecordStore for ScriptedStore {
        async fn save(&self, record: NewShortUrlRecord) -> StoreResult<ShortUrlRecord> {
            self.inner.save(record).await
        }

        async fn find_by_id_for_owner(
            &self,
            id: &RecordId,
            owner: &Owner,
        ) -> StoreResult<Option<ShortUrlRecord>> {
            self.inner.find_by_id_for_owner(id, owner).await
        }

        async fn find_by_key(&self, key: &ShortKey) -> StoreResult<Option<ShortUrlRecord>> {
            self.inner.find_by_key(key).await
        }

        async fn list_by_owner(
            &self,
            owner: &Owner,
            page: u32,
            size: u32,
        ) -> StoreResult<Page<ShortUrlRecord>> {
            self.inner.list_by_owner(owner, page, size).await
        }

        fn find_expired(&self, now: Timestamp) -> BoxStream<'_, StoreResult<ShortUrlRecord>> {
            let corrupt = stream::iter(
                (0..self.corrupt_rows)
                    .map(|i| Err(StorageError::InvalidData(format!("corrupt row {i}")))),
            );
            let rows = corrupt.chain(self.inner.find_expired(now));

            match self.gate.clone() {
                Some(gate) => stream::once(async move {
                    gate.notified().await;
                    rows
                })
                .flatten()
                .boxed(),
                None => rows.boxed(),
            }
        }

        async fn delete_by_id(&self, id: &RecordId) -> StoreResult<bool> {
            if self.undeletable.contains(id.as_str()) {
                return Err(StorageError::Unavailable(format!("delete {id}")));
            }
            self.inner.delete_by_id(id).await
        }
    }

    fn new_record(key: &str, expires_at: Timestamp) -> NewShortUrlRecord {
        NewShortUrlRecord {
            key: ShortKey::new_unchecked(key),
            url: format!("https://example.com/{key}"),
            description: None,
            owner: Owner::new("alice").unwrap(),
            expires_at,
        }
    }

    fn past() -> Timestamp {
        Timestamp::now() - SignedDuration::from_secs(1)
    }

    fn future() -> Timestamp {
        Timestamp::now() + SignedDuration::from_hours(1)
    }

    /// Saves three expired records and one live one, caching all of them.
    async fn seed<S: RecordStore, C: UrlCache>(reaper: &Reaper<S, C>) -> Vec<ShortUrlRecord> {
        let mut records = Vec::new();
        for (key, expires_at) in [
            ("key001", past()),
            ("key002", past()),
            ("key003", past()),
            ("live01", future()),
        ] {
            let record = reaper.store().save(new_record(key, expires_at)).await.unwrap();
            reaper
                .cache()
                .set_url(&record.key, &record, Duration::from_secs(3600))
                .await
                .unwrap();
            records.push(record);
        }
        records
    }

    fn completed(outcome: RunOutcome) -> ReapReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::Skipped => panic!("sweep was skipped"),
        }
    }

    #[tokio::test]
    async fn removes_expired_records_from_both_tiers() {
        let reaper = Reaper::new(
            InMemoryRecordStore::new(),
            MokaUrlCache::new(),
            ReaperSettings::default(),
        );
        let records = seed(&reaper).await;

        let report = completed(reaper.run_once(Timestamp::now()).await);

        assert_eq!(
            report,
            ReapReport {
                scanned: 3,
                cache_evicted: 3,
                store_deleted: 3,
                ..ReapReport::default()
            }
        );
        assert_eq!(reaper.store().len(), 1);
        for record in &records[..3] {
            assert!(reaper.cache().get_url(&record.key).await.unwrap().is_none());
        }
        assert!(reaper.cache().get_url(&records[3].key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cache_failure_does_not_stop_the_sweep() {
        let cache = StickyCache {
            sticky: HashSet::from(["key002".to_string()]),
            ..StickyCache::default()
        };
        let reaper = Reaper::new(InMemoryRecordStore::new(), cache, ReaperSettings::default());
        let records = seed(&reaper).await;

        let report = completed(reaper.run_once(Timestamp::now()).await);

        assert_eq!(report.scanned, 3);
        assert_eq!(report.cache_evicted, 2);
        assert_eq!(report.cache_failures, 1);
        assert_eq!(report.store_deleted, 3);
        assert_eq!(report.failures(), 1);
        assert_eq!(reaper.store().len(), 1);
        assert!(reaper.cache().get_url(&records[0].key).await.unwrap().is_none());
        assert!(reaper.cache().get_url(&records[2].key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_failure_does_not_stop_the_sweep() {
        let reaper = Reaper::new(
            ScriptedStore {
                // the in-memory store numbers ids from 1
                undeletable: HashSet::from([format!("{:024x}", 1)]),
                ..ScriptedStore::default()
            },
            MokaUrlCache::new(),
            ReaperSettings::default(),
        );
        seed(&reaper).await;

        let report = completed(reaper.run_once(Timestamp::now()).await);

        assert_eq!(report.scanned, 3);
        assert_eq!(report.store_deleted, 2);
        assert_eq!(report.store_failures, 1);
        assert_eq!(reaper.store().inner.len(), 2);
    }

    #[tokio::test]
    async fn stream_errors_are_skipped() {
        let reaper = Reaper::new(
            ScriptedStore {
                corrupt_rows: 2,
                ..ScriptedStore::default()
            },
            MokaUrlCache::new(),
            ReaperSettings::default(),
        );
        seed(&reaper).await;

        let report = completed(reaper.run_once(Timestamp::now()).await);

        assert_eq!(report.stream_errors, 2);
        assert_eq!(report.scanned, 3);
        assert_eq!(report.store_deleted, 3);
    }

    #[tokio::test]
    async fn disabled_reaper_touches_nothing() {
        let reaper = Reaper::new(
            InMemoryRecordStore::new(),
            MokaUrlCache::new(),
            ReaperSettings::builder().enabled(false).build(),
        );
        let records = seed(&reaper).await;

        let report = completed(reaper.run_once(Timestamp::now()).await);

        assert_eq!(report, ReapReport::default());
        assert_eq!(reaper.store().len(), 4);
        assert!(reaper.cache().get_url(&records[0].key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn only_records_expired_by_now_are_reaped() {
        let reaper = Reaper::new(
            InMemoryRecordStore::new(),
            MokaUrlCache::new(),
            ReaperSettings::default(),
        );
        seed(&reaper).await;

        let report = completed(reaper.run_once(Timestamp::now() - SignedDuration::from_hours(1)).await);

        assert_eq!(report.scanned, 0);
        assert_eq!(reaper.store().len(), 4);
    }

    #[tokio::test]
    async fn overlapping_sweep_is_skipped() {
        let gate = Arc::new(Notify::new());
        let reaper = Reaper::new(
            ScriptedStore {
                gate: Some(Arc::clone(&gate)),
                ..ScriptedStore::default()
            },
            MokaUrlCache::new(),
            ReaperSettings::default(),
        );
        seed(&reaper).await;

        let first = {
            let reaper = reaper.clone();
            tokio::spawn(async move { reaper.run_once(Timestamp::now()).await })
        };
        while !reaper.is_running() {
            tokio::task::yield_now().await;
        }

        assert_eq!(reaper.run_once(Timestamp::now()).await, RunOutcome::Skipped);

        gate.notify_one();
        let report = completed(first.await.unwrap());
        assert_eq!(report.store_deleted, 3);
        assert!(!reaper.is_running());
    }

    #[tokio::test]
    async fn scheduled_loop_sweeps_until_shutdown() {
        let reaper = Reaper::new(
            InMemoryRecordStore::new(),
            MokaUrlCache::new(),
            ReaperSettings::default(),
        );
        seed(&reaper).await;
        let schedule = ReaperSchedule::new("* * * * * *", "UTC").unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

        let handle = {
            let reaper = reaper.clone();
            tokio::spawn(async move {
                reaper
                    .run(&schedule, async {
                        let _ = stopped.await;
                    })
                    .await
            })
        };

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while reaper.store().len() > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(reaper.store().len(), 1);

        stop.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
