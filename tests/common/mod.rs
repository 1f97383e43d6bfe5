/*!
 * Common test utilities for the termroute test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use termroute::errors::{CacheError, MethodInvocationError, SourceError};
use termroute::glossary::cache::CacheRecord;
use termroute::glossary::{
    CacheStore, CastMember, MemoryCacheStore, MetadataProvider, ProductionKey, ProductionMetadata,
};
use termroute::providers::{MethodOutput, TranslationMethod};
use termroute::segment::Segment;

/// Route engine logs to the test output; repeated calls are harmless
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn movie_x() -> ProductionKey {
    ProductionKey::new("Movie X", 2020)
}

/// Cast list used by the metadata fixtures
pub fn movie_x_metadata() -> ProductionMetadata {
    ProductionMetadata {
        cast: vec![
            CastMember {
                name: "Shah Rukh Khan".to_string(),
                character: Some("Rahul".to_string()),
            },
            CastMember {
                name: "Kajol".to_string(),
                character: Some("Anjali".to_string()),
            },
        ],
        ..Default::default()
    }
}

/// Dialogue transcript of `count` segments, 2 seconds apart
pub fn dialogue_transcript(count: usize) -> Vec<Segment> {
    (0..count)
        .map(|i| {
            let start = i as u64 * 2_000;
            Segment::dialogue(i, start, start + 1_500, &format!("Line {} yaar, chalo", i))
        })
        .collect()
}

/// Metadata provider that counts fetches and answers after a delay
#[derive(Debug)]
pub struct CountingMetadataProvider {
    metadata: ProductionMetadata,
    delay: Duration,
    fetches: AtomicUsize,
}

impl CountingMetadataProvider {
    pub fn new(metadata: ProductionMetadata, delay: Duration) -> Self {
        Self {
            metadata,
            delay,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for CountingMetadataProvider {
    async fn fetch(&self, _key: &ProductionKey) -> Result<ProductionMetadata, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.metadata.clone())
    }
}

/// Cache store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn load(&self, _key: &ProductionKey) -> Result<Option<CacheRecord>, CacheError> {
        Err(CacheError::Read("disk unavailable".to_string()))
    }

    async fn save(&self, _record: &CacheRecord) -> Result<(), CacheError> {
        Err(CacheError::Write("disk unavailable".to_string()))
    }

    async fn remove(&self, _key: &ProductionKey) -> Result<bool, CacheError> {
        Err(CacheError::Write("disk unavailable".to_string()))
    }

    async fn remove_expired(&self, _now: DateTime<Utc>) -> Result<usize, CacheError> {
        Err(CacheError::Write("disk unavailable".to_string()))
    }
}

/// In-memory store whose first removal stalls before deleting
#[derive(Debug)]
pub struct SlowRemoveStore {
    inner: MemoryCacheStore,
    delay: Duration,
    stalled: AtomicBool,
}

impl SlowRemoveStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryCacheStore::new(),
            delay,
            stalled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CacheStore for SlowRemoveStore {
    async fn load(&self, key: &ProductionKey) -> Result<Option<CacheRecord>, CacheError> {
        self.inner.load(key).await
    }

    async fn save(&self, record: &CacheRecord) -> Result<(), CacheError> {
        self.inner.save(record).await
    }

    async fn remove(&self, key: &ProductionKey) -> Result<bool, CacheError> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.remove(key).await
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        self.inner.remove_expired(now).await
    }
}

/// Method whose latency shrinks with the segment index, so later segments finish first
#[derive(Debug)]
pub struct StaggeredMethod {
    id: String,
    segments: usize,
    step: Duration,
}

impl StaggeredMethod {
    pub fn new(id: &str, segments: usize, step: Duration) -> Self {
        Self {
            id: id.to_string(),
            segments,
            step,
        }
    }
}

#[async_trait]
impl TranslationMethod for StaggeredMethod {
    fn id(&self) -> &str {
        &self.id
    }

    async fn translate(&self, segment: &Segment) -> Result<MethodOutput, MethodInvocationError> {
        let remaining = self.segments.saturating_sub(segment.index) as u32;
        tokio::time::sleep(self.step * remaining).await;
        Ok(MethodOutput::new(segment.text.clone(), Some(0.95)))
    }
}
