/*!
 * Integration tests for the term cache and its storage backends
 */

use chrono::{Duration, TimeZone, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use termroute::app_config::GlossaryConfig;
use termroute::glossary::{CacheStore, ManualClock, MemoryCacheStore, SqliteCacheStore, TermCache};

use crate::common::{self, CountingMetadataProvider, FailingCacheStore, SlowRemoveStore};

#[tokio::test]
async fn test_getOrFetch_withConcurrentCallers_shouldFetchOnce() {
    let cache = Arc::new(TermCache::in_memory(Duration::days(30)));
    let provider = Arc::new(CountingMetadataProvider::new(
        common::movie_x_metadata(),
        StdDuration::from_millis(50),
    ));
    let key = common::movie_x();

    let calls = (0..8).map(|_| {
        let cache = cache.clone();
        let provider = provider.clone();
        let key = key.clone();
        async move { cache.get_or_fetch(&key, provider.as_ref()).await }
    });
    let results = join_all(calls).await;

    assert_eq!(provider.fetch_count(), 1);
    assert!(results.iter().all(|r| matches!(r, Ok(terms) if terms.len() == 4)));

    // A later read within the TTL is served from the cache
    assert!(cache.get(&key).await.is_some());
    cache.get_or_fetch(&key, provider.as_ref()).await.unwrap();
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(cache.statistics().fetches, 1);
}

#[tokio::test]
async fn test_get_afterTtl_shouldMissAndRefetch() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let cache = TermCache::with_clock(Arc::new(MemoryCacheStore::new()), Duration::days(30), clock.clone());
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);
    let key = common::movie_x();

    cache.get_or_fetch(&key, &provider).await.unwrap();
    clock.advance(Duration::days(29));
    assert!(cache.get(&key).await.is_some());

    clock.advance(Duration::days(2));
    assert!(cache.get(&key).await.is_none());
    assert_eq!(cache.statistics().evictions, 1);

    cache.get_or_fetch(&key, &provider).await.unwrap();
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test]
async fn test_sqliteStore_shouldSurviveReopen() {
    let dir = common::create_temp_dir().unwrap();
    let db_path = dir.path().join("cache").join("terms.db");
    let key = common::movie_x();
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);

    {
        let store = SqliteCacheStore::open(Some(db_path.as_path())).unwrap();
        let cache = TermCache::new(Arc::new(store), Duration::days(30));
        cache.get_or_fetch(&key, &provider).await.unwrap();
    }

    let store = SqliteCacheStore::open(Some(db_path.as_path())).unwrap();
    let cache = TermCache::new(Arc::new(store), Duration::days(30));
    let terms = cache.get(&key).await.unwrap();

    assert_eq!(terms.len(), 4);
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(cache.statistics().hits, 1);
}

#[tokio::test]
async fn test_invalidate_shouldForceRefetch() {
    let cache = TermCache::in_memory(Duration::days(30));
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);
    let key = common::movie_x();

    cache.get_or_fetch(&key, &provider).await.unwrap();
    assert!(cache.invalidate(&key).await);
    assert!(!cache.invalidate(&key).await);

    cache.get_or_fetch(&key, &provider).await.unwrap();
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test]
async fn test_getOrFetch_withFailingStore_shouldStillServeTerms() {
    let cache = TermCache::new(Arc::new(FailingCacheStore), Duration::days(30));
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);
    let key = common::movie_x();

    let terms = cache.get_or_fetch(&key, &provider).await.unwrap();

    assert_eq!(terms.len(), 4);
    let stats = cache.statistics();
    assert!(stats.storage_errors >= 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(cache.purge_expired().await, 0);
}

#[tokio::test]
async fn test_get_withStaleReaderRacingRefetch_shouldKeepFreshRecord() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let store = Arc::new(SlowRemoveStore::new(StdDuration::from_millis(200)));
    let cache = TermCache::with_clock(store, Duration::days(30), clock.clone());
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);
    let key = common::movie_x();

    cache.get_or_fetch(&key, &provider).await.unwrap();
    clock.advance(Duration::days(31));

    // One job reads the expired record while another refetches it
    let (stale, refetched) = tokio::join!(cache.get(&key), cache.get_or_fetch(&key, &provider));
    assert!(stale.is_none());
    assert!(refetched.is_ok());

    cache.get_or_fetch(&key, &provider).await.unwrap();
    assert_eq!(provider.fetch_count(), 2);
    assert!(cache.get(&key).await.is_some());
    assert_eq!(cache.statistics().evictions, 1);
}

#[tokio::test]
async fn test_fromConfig_shouldUseConfiguredPathAndTtl() {
    let dir = common::create_temp_dir().unwrap();
    let db_path = dir.path().join("cache").join("terms.db");
    let config = GlossaryConfig {
        cache_ttl_days: 2,
        cache_db_path: Some(db_path.clone()),
        ..Default::default()
    };
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);
    let key = common::movie_x();

    let cache = TermCache::from_config(&config);
    assert_eq!(cache.ttl(), Duration::days(2));
    cache.get_or_fetch(&key, &provider).await.unwrap();

    assert!(db_path.is_file());
    let record = SqliteCacheStore::open(Some(db_path.as_path()))
        .unwrap()
        .load(&key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.ttl_secs, Duration::days(2).num_seconds());

    let reopened = TermCache::from_config(&config);
    assert!(reopened.get(&key).await.is_some());
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn test_fromConfig_withUnusableDbPath_shouldFallBackToMemory() {
    let dir = common::create_temp_dir().unwrap();
    let blocker = common::create_test_file(dir.path(), "not_a_dir", "x").unwrap();
    let config = GlossaryConfig {
        cache_db_path: Some(blocker.join("terms.db")),
        ..Default::default()
    };
    let provider = CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO);
    let key = common::movie_x();

    let cache = TermCache::from_config(&config);
    cache.get_or_fetch(&key, &provider).await.unwrap();

    assert!(cache.get(&key).await.is_some());
    assert_eq!(cache.statistics().storage_errors, 0);
    assert_eq!(cache.ttl(), config.cache_ttl());
}
