/*!
 * TTL-bound cache of externally-fetched term sets.
 *
 * Records are keyed by production identity `(title, year)` and are only
 * served after an explicit freshness check. The cache is best-effort: a
 * storage failure is logged and reported as a miss, so callers always fall
 * back to a live fetch.
 *
 * Population and eviction are serialized per key: concurrent jobs for the
 * same production wait on one fetch instead of each issuing their own, and a
 * reader holding a stale view never removes a record refreshed meanwhile.
 */

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OwnedMutexGuard;

use crate::app_config::GlossaryConfig;
use crate::database::Repository;
use crate::database::models::TermCacheRow;
use crate::errors::{CacheError, SourceError};

use super::metadata::MetadataProvider;
use super::model::{ProductionKey, TermSet};

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A stored term set with its freshness bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: ProductionKey,
    pub terms: TermSet,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: i64,
}

impl CacheRecord {
    /// Fresh while `now - fetched_at < ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < Duration::seconds(self.ttl_secs)
    }
}

/// Storage backend of the term cache
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Load the record for a key, if any
    async fn load(&self, key: &ProductionKey) -> Result<Option<CacheRecord>, CacheError>;

    /// Store a record, replacing any previous one for the same key
    async fn save(&self, record: &CacheRecord) -> Result<(), CacheError>;

    /// Remove the record for a key; returns whether one existed
    async fn remove(&self, key: &ProductionKey) -> Result<bool, CacheError>;

    /// Remove every record expired at `now`; returns how many were removed
    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError>;
}

/// In-process store, lost at exit
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    records: RwLock<HashMap<String, CacheRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self, key: &ProductionKey) -> Result<Option<CacheRecord>, CacheError> {
        Ok(self.records.read().get(&key.fingerprint()).cloned())
    }

    async fn save(&self, record: &CacheRecord) -> Result<(), CacheError> {
        self.records.write().insert(record.key.fingerprint(), record.clone());
        Ok(())
    }

    async fn remove(&self, key: &ProductionKey) -> Result<bool, CacheError> {
        Ok(self.records.write().remove(&key.fingerprint()).is_some())
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.is_fresh(now));
        Ok(before - records.len())
    }
}

/// SQLite-backed store, shared across processes
#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    repository: Repository,
}

impl SqliteCacheStore {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Open the store at `path`, or at the default data directory location
    pub fn open(path: Option<&std::path::Path>) -> Result<Self, CacheError> {
        let db = match path {
            Some(path) => crate::database::DatabaseConnection::new(path),
            None => crate::database::DatabaseConnection::new_default(),
        }
        .map_err(|e| CacheError::Write(format!("{:#}", e)))?;
        Ok(Self::new(Repository::new(db)))
    }

    fn to_row(record: &CacheRecord) -> Result<TermCacheRow, CacheError> {
        let terms_json = serde_json::to_string(&record.terms).map_err(|e| CacheError::Write(e.to_string()))?;
        Ok(TermCacheRow {
            key_fingerprint: record.key.fingerprint(),
            title: record.key.title.clone(),
            year: record.key.year,
            terms_json,
            fetched_at_ms: record.fetched_at.timestamp_millis(),
            ttl_secs: record.ttl_secs,
        })
    }

    fn from_row(row: TermCacheRow) -> Result<CacheRecord, CacheError> {
        let terms: TermSet = serde_json::from_str(&row.terms_json).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let fetched_at = Utc
            .timestamp_millis_opt(row.fetched_at_ms)
            .single()
            .ok_or_else(|| CacheError::Corrupt(format!("invalid timestamp {}", row.fetched_at_ms)))?;
        Ok(CacheRecord {
            key: ProductionKey::new(&row.title, row.year),
            terms,
            fetched_at,
            ttl_secs: row.ttl_secs,
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn load(&self, key: &ProductionKey) -> Result<Option<CacheRecord>, CacheError> {
        let row = self
            .repository
            .get_term_cache_row(&key.fingerprint())
            .await
            .map_err(|e| CacheError::Read(format!("{:#}", e)))?;
        row.map(Self::from_row).transpose()
    }

    async fn save(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let row = Self::to_row(record)?;
        self.repository
            .upsert_term_cache_row(&row)
            .await
            .map_err(|e| CacheError::Write(format!("{:#}", e)))
    }

    async fn remove(&self, key: &ProductionKey) -> Result<bool, CacheError> {
        self.repository
            .delete_term_cache_row(&key.fingerprint())
            .await
            .map_err(|e| CacheError::Write(format!("{:#}", e)))
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        self.repository
            .delete_expired_term_cache_rows(now.timestamp_millis())
            .await
            .map_err(|e| CacheError::Write(format!("{:#}", e)))
    }
}

/// Cache counters since process start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    /// Live fetches issued through `get_or_fetch`
    pub fetches: u64,
    /// Records dropped because their TTL had elapsed
    pub evictions: u64,
    /// Storage failures degraded to misses
    pub storage_errors: u64,
}

impl CacheStatistics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 { self.hits as f64 / total as f64 } else { 0.0 }
    }
}

/// Term cache shared by every job in the process
#[derive(Debug)]
pub struct TermCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
    storage_errors: AtomicU64,
    key_locks: KeyLocks,
}

type KeyLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive hold on one production key; drops its map entry when nobody else waits
struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    fingerprint: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        self.guard.take();
        if locks.get(&self.fingerprint).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.fingerprint);
        }
    }
}

/// What a store read found for a key
enum Lookup {
    Fresh(TermSet),
    /// Expired record, identified by its fetch time
    Stale(DateTime<Utc>),
    Absent,
}

impl TermCache {
    /// Create a cache over `store` with the given TTL
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit clock
    pub fn with_clock(store: Arc<dyn CacheStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            storage_errors: AtomicU64::new(0),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory cache, for tests and ephemeral runs
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), ttl)
    }

    /// Cache at the configured database path with the configured TTL.
    ///
    /// Falls back to an in-memory store when the database cannot be opened.
    pub fn from_config(config: &GlossaryConfig) -> Self {
        let ttl = config.cache_ttl();
        match SqliteCacheStore::open(config.cache_db_path.as_deref()) {
            Ok(store) => {
                info!("Term cache opened with a TTL of {} days", ttl.num_days());
                Self::new(Arc::new(store), ttl)
            }
            Err(e) => {
                warn!("Term cache database unavailable, caching in memory only: {}", e);
                Self::in_memory(ttl)
            }
        }
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current time according to the cache clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Get a fresh term set, or `None` on miss, expiry or storage failure.
    pub async fn get(&self, key: &ProductionKey) -> Option<TermSet> {
        let found = match self.lookup(key).await {
            Lookup::Fresh(terms) => Some(terms),
            Lookup::Stale(seen) => {
                let _guard = self.lock_key(key).await;
                self.evict_stale(key, seen).await;
                None
            }
            Lookup::Absent => None,
        };
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Term cache hit for {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Term cache miss for {}", key);
        }
        found
    }

    /// TTL-checked read without touching hit/miss counters
    async fn lookup(&self, key: &ProductionKey) -> Lookup {
        match self.store.load(key).await {
            Ok(Some(record)) if record.is_fresh(self.clock.now()) => Lookup::Fresh(record.terms),
            Ok(Some(record)) => {
                debug!("Term cache record for {} expired (fetched {})", key, record.fetched_at);
                Lookup::Stale(record.fetched_at)
            }
            Ok(None) => Lookup::Absent,
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Term cache read failed for {}, treating as miss: {}", key, e);
                Lookup::Absent
            }
        }
    }

    /// Remove the record fetched at `seen` if it is still the stored one.
    /// Callers hold the key lock.
    async fn evict_stale(&self, key: &ProductionKey, seen: DateTime<Utc>) {
        match self.store.load(key).await {
            Ok(Some(record)) if record.fetched_at == seen && !record.is_fresh(self.clock.now()) => {}
            Ok(_) => {
                debug!("Term cache record for {} changed before eviction, keeping it", key);
                return;
            }
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Term cache read failed for {} before eviction: {}", key, e);
                return;
            }
        }

        self.evictions.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.store.remove(key).await {
            self.storage_errors.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to evict expired term cache record for {}: {}", key, e);
        }
    }

    /// Store a term set, replacing any previous record. Returns whether it was persisted.
    pub async fn put(&self, key: &ProductionKey, terms: TermSet, fetched_at: DateTime<Utc>) -> bool {
        let record = CacheRecord {
            key: key.clone(),
            terms,
            fetched_at,
            ttl_secs: self.ttl.num_seconds(),
        };

        match self.store.save(&record).await {
            Ok(()) => {
                debug!("Cached {} terms for {}", record.terms.len(), key);
                true
            }
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Term cache write failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Drop the record for a key, e.g. after upstream metadata changed
    pub async fn invalidate(&self, key: &ProductionKey) -> bool {
        match self.store.remove(key).await {
            Ok(existed) => {
                info!("Invalidated term cache for {}", key);
                existed
            }
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Term cache invalidation failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Remove every expired record
    pub async fn purge_expired(&self) -> usize {
        match self.store.remove_expired(self.clock.now()).await {
            Ok(removed) => {
                self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
                if removed > 0 {
                    info!("Purged {} expired term cache records", removed);
                }
                removed
            }
            Err(e) => {
                self.storage_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Term cache purge failed: {}", e);
                0
            }
        }
    }

    /// Return the cached set, or fetch it once and populate the cache.
    ///
    /// Callers for the same key are serialized, so only the first one fetches.
    pub async fn get_or_fetch(
        &self,
        key: &ProductionKey,
        provider: &dyn MetadataProvider,
    ) -> Result<TermSet, SourceError> {
        if let Some(terms) = self.get(key).await {
            return Ok(terms);
        }

        let _guard = self.lock_key(key).await;

        // Another caller may have populated the key while we waited
        match self.lookup(key).await {
            Lookup::Fresh(terms) => {
                debug!("Term cache for {} populated by a concurrent fetch", key);
                return Ok(terms);
            }
            Lookup::Stale(seen) => self.evict_stale(key, seen).await,
            Lookup::Absent => {}
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        info!("Fetching production metadata for {}", key);
        let metadata = provider.fetch(key).await?;
        let terms = metadata.to_term_set();
        self.put(key, terms.clone(), self.clock.now()).await;
        Ok(terms)
    }

    async fn lock_key(&self, key: &ProductionKey) -> KeyGuard<'_> {
        let fingerprint = key.fingerprint();
        let lock = self
            .key_locks
            .lock()
            .entry(fingerprint.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        KeyGuard {
            locks: &self.key_locks,
            fingerprint,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Counters since process start
    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
        }
    }
}
