/*!
 * Production metadata from the enrichment service, and its conversion
 * into the external term set.
 */

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::SourceError;

use super::model::{ProductionKey, Provenance, TermEntry, TermSet};

/// A credited cast member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

/// Metadata for one production
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductionMetadata {
    /// Cast in billing order
    #[serde(default)]
    pub cast: Vec<CastMember>,

    /// Crew names
    #[serde(default)]
    pub crew: Vec<String>,

    /// Soundtrack titles
    #[serde(default)]
    pub soundtrack: Vec<String>,

    /// Alternative spellings mapped to their canonical form
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl ProductionMetadata {
    /// Derive the external term set.
    ///
    /// Names are identity terms so translation methods cannot mangle them.
    /// Billing order is carried as usage so leading roles rank first for biasing.
    pub fn to_term_set(&self) -> TermSet {
        let mut entries = Vec::new();
        let billed = self.cast.len() as u64;

        for (position, member) in self.cast.iter().enumerate() {
            let usage = billed - position as u64;
            entries.push(TermEntry::new(&member.name, &member.name, Provenance::External).with_usage(usage));
            if let Some(character) = member.character.as_deref().filter(|c| !c.trim().is_empty()) {
                entries.push(TermEntry::new(character, character, Provenance::External).with_usage(usage));
            }
        }

        for name in &self.crew {
            entries.push(TermEntry::new(name, name, Provenance::External));
        }

        for title in &self.soundtrack {
            entries.push(TermEntry::new(title, title, Provenance::External).with_context("sung"));
        }

        for (alias, canonical) in &self.aliases {
            entries.push(TermEntry::new(alias, canonical, Provenance::External));
        }

        TermSet::new(entries.into_iter().filter(TermEntry::is_usable).collect())
    }
}

/// Client for the metadata enrichment service
#[async_trait]
pub trait MetadataProvider: Send + Sync + Debug {
    /// Fetch metadata for a production
    async fn fetch(&self, key: &ProductionKey) -> Result<ProductionMetadata, SourceError>;
}

/// In-memory provider, for offline runs and tests
#[derive(Debug, Default)]
pub struct StaticMetadataProvider {
    productions: RwLock<HashMap<String, ProductionMetadata>>,
    fetch_count: AtomicUsize,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for a production
    pub fn with_production(self, key: &ProductionKey, metadata: ProductionMetadata) -> Self {
        self.productions.write().insert(key.normalized(), metadata);
        self
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn fetch(&self, key: &ProductionKey) -> Result<ProductionMetadata, SourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.productions
            .read()
            .get(&key.normalized())
            .cloned()
            .ok_or_else(|| SourceError::FetchFailed {
                key: key.to_string(),
                reason: "unknown production".to_string(),
            })
    }
}
