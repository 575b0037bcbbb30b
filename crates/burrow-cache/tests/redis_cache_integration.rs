use std::time::Duration;

use burrow_cache::{RedisUrlCache, UrlCache};
use burrow_core::{Owner, RecordId, ShortKey, ShortUrlRecord};
use burrow_test_infra::redis::RedisServer;
use jiff::{SignedDuration, Timestamp};

struct Fixture {
    _redis: RedisServer,
    cache: RedisUrlCache,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new().await.expect("start redis");
        let url = redis.url().await.expect("redis url");
        let cache = connect_with_retry(&url).await;

        Self {
            _redis: redis,
            cache,
        }
    }
}

async fn connect_with_retry(url: &str) -> RedisUrlCache {
    let mut last_error = None;

    for _ in 0..20 {
        match RedisUrlCache::connect(url).await {
            Ok(cache) => return cache,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect redis: {last_error:?}");
}

fn record(key: &str) -> ShortUrlRecord {
    let now = Timestamp::now();
    ShortUrlRecord {
        id: RecordId::new_unchecked("7"),
        key: ShortKey::new_unchecked(key),
        url: format!("https://example.com/{key}"),
        description: Some("cached".to_string()),
        created_at: now,
        owner: Owner::new("alice").unwrap(),
        last_updated_at: now,
        last_updated_by: "alice".to_string(),
        expires_at: now + SignedDuration::from_hours(24),
    }
}

#[tokio::test]
async fn set_then_get_round_trips_json() {
    let fixture = Fixture::start().await;
    let key = ShortKey::new_unchecked("abc123");
    let record = record("abc123");

    fixture
        .cache
        .set_url(&key, &record, Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(fixture.cache.get_url(&key).await.unwrap(), Some(record));
}

#[tokio::test]
async fn missing_key_is_a_miss() {
    let fixture = Fixture::start().await;

    let cached = fixture
        .cache
        .get_url(&ShortKey::new_unchecked("nope00"))
        .await
        .unwrap();

    assert!(cached.is_none());
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let fixture = Fixture::start().await;
    let key = ShortKey::new_unchecked("brief0");

    fixture
        .cache
        .set_url(&key, &record("brief0"), Duration::from_millis(200))
        .await
        .unwrap();
    assert!(fixture.cache.get_url(&key).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(fixture.cache.get_url(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn del_removes_entry_and_is_idempotent() {
    let fixture = Fixture::start().await;
    let key = ShortKey::new_unchecked("gone00");

    fixture
        .cache
        .set_url(&key, &record("gone00"), Duration::from_secs(60))
        .await
        .unwrap();

    fixture.cache.del(&key).await.unwrap();
    fixture.cache.del(&key).await.unwrap();

    assert!(fixture.cache.get_url(&key).await.unwrap().is_none());
}
