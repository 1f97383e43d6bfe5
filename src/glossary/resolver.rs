/*!
 * Term resolver: loads every term source for a production and builds the
 * job's glossary snapshot.
 *
 * Sources are loaded independently. A missing or unreadable optional source
 * contributes zero terms and is logged; only a load where no source at all
 * succeeded is an error.
 */

use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::GlossaryConfig;
use crate::errors::{ResolverError, SourceError};
use crate::file_utils::FileManager;

use super::cache::TermCache;
use super::metadata::MetadataProvider;
use super::model::{ProductionKey, Provenance, TermEntry, TermSource};
use super::parser::detect_parser;
use super::snapshot::{BiasTerm, GlossarySnapshot};
use super::stats::{GlossaryStatistics, LoadStats, SourceLoad};

/// Extensions probed for a production term file, in order
const PRODUCTION_FILE_EXTENSIONS: [&str; 3] = ["json", "tsv", "txt"];

/// Record form written by `export_learned`
#[derive(Debug, Serialize)]
struct LearnedRecord<'a> {
    source: &'a str,
    translation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    usage_count: u64,
}

/// Loads term sources and serves the merged glossary for one job
pub struct TermResolver {
    config: GlossaryConfig,
    cache: Arc<TermCache>,
    provider: Option<Arc<dyn MetadataProvider>>,
    extra_sources: Vec<TermSource>,
    learned: Option<TermSource>,
    snapshot: Option<Arc<GlossarySnapshot>>,
    load_stats: LoadStats,
}

impl TermResolver {
    /// Create a resolver over the shared term cache
    pub fn new(config: GlossaryConfig, cache: Arc<TermCache>) -> Self {
        Self {
            config,
            cache,
            provider: None,
            extra_sources: Vec::new(),
            learned: None,
            snapshot: None,
            load_stats: LoadStats::default(),
        }
    }

    /// Use a metadata enrichment service for the external source
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register an in-memory source, merged after the configured ones
    pub fn with_source(mut self, source: TermSource) -> Self {
        self.extra_sources.push(source);
        self
    }

    /// Load every configured source and build the snapshot
    pub async fn load_all_sources(&mut self, production: &ProductionKey) -> Result<LoadStats, ResolverError> {
        info!("Loading term sources for {}", production);
        let mut stats = LoadStats::default();
        let mut sources = Vec::new();

        // Production-specific file
        if let Some(dir) = self.config.production_terms_dir.clone() {
            let name = production.file_stem();
            match Self::find_production_file(&dir, production) {
                Some(path) => self.load_file(&name, &path, Provenance::Production, &mut stats, &mut sources).await,
                None => {
                    let error = SourceError::Missing {
                        name: name.clone(),
                        path: dir.join(format!("{}.*", name)).display().to_string(),
                    };
                    info!("{}", error);
                    stats.record(SourceLoad::failed(&name, Provenance::Production, error));
                }
            }
        }

        // External metadata, through the cache
        if let Some(provider) = self.provider.clone() {
            let fetches_before = self.cache.statistics().fetches;
            match self.cache.get_or_fetch(production, provider.as_ref()).await {
                Ok(terms) => {
                    stats.external_from_cache = self.cache.statistics().fetches == fetches_before;
                    let source = TermSource::new("external", Provenance::External, terms.entries);
                    debug!(
                        "Loaded {} external terms ({})",
                        source.len(),
                        if stats.external_from_cache { "cached" } else { "fetched" }
                    );
                    stats.record(SourceLoad::loaded("external", Provenance::External, source.len(), None));
                    sources.push(source);
                }
                Err(e) => {
                    warn!("External term source unavailable: {}", e);
                    stats.record(SourceLoad::failed("external", Provenance::External, e));
                }
            }
        }

        // Master glossary
        if let Some(path) = self.config.master_terms_path.clone() {
            self.load_file("master", &path, Provenance::Master, &mut stats, &mut sources)
                .await;
        }

        // Learned glossary
        if self.config.learning_enabled {
            if let Some(path) = self.config.learned_terms_path.clone() {
                self.load_file("learned", &path, Provenance::Learned, &mut stats, &mut sources)
                    .await;
                self.learned = sources.iter().find(|s| s.provenance == Provenance::Learned).cloned();
            }
        } else {
            debug!("Learning disabled, skipping learned term source");
        }

        for source in &self.extra_sources {
            stats.record(SourceLoad::loaded(&source.name, source.provenance, source.len(), None));
            sources.push(source.clone());
        }

        if stats.sources_loaded == 0 {
            return Err(ResolverError::NoSources(production.to_string()));
        }

        let snapshot = GlossarySnapshot::build(production.clone(), &sources);
        stats.total_terms = snapshot.len();
        stats.distinct_terms = snapshot.distinct_terms();
        stats.shadowed_terms = snapshot.shadowed_count();

        info!(
            "Glossary for {}: {} terms from {} sources ({} shadowed)",
            production, stats.total_terms, stats.sources_loaded, stats.shadowed_terms
        );

        self.snapshot = Some(Arc::new(snapshot));
        self.load_stats = stats.clone();
        Ok(stats)
    }

    fn find_production_file(dir: &Path, production: &ProductionKey) -> Option<PathBuf> {
        let stem = production.file_stem();
        PRODUCTION_FILE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", stem, ext)))
            .find(|path| FileManager::file_exists(path))
    }

    async fn load_file(
        &self,
        name: &str,
        path: &Path,
        provenance: Provenance,
        stats: &mut LoadStats,
        sources: &mut Vec<TermSource>,
    ) {
        match Self::read_source(name, path, provenance).await {
            Ok((source, parser)) => {
                debug!("Loaded {} {} terms from {:?} ({} parser)", source.len(), provenance, path, parser);
                stats.record(SourceLoad::loaded(name, provenance, source.len(), Some(parser)));
                sources.push(source);
            }
            Err(e) => {
                warn!("{}; continuing without it", e);
                stats.record(SourceLoad::failed(name, provenance, e));
            }
        }
    }

    async fn read_source(
        name: &str,
        path: &Path,
        provenance: Provenance,
    ) -> Result<(TermSource, &'static str), SourceError> {
        if !FileManager::file_exists(path) {
            return Err(SourceError::Missing {
                name: name.to_string(),
                path: path.display().to_string(),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Unreadable {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let parser = detect_parser(&content);
        let entries = parser
            .parse(&content, provenance)
            .map_err(|reason| SourceError::Unreadable {
                name: name.to_string(),
                reason,
            })?;

        Ok((TermSource::new(name, provenance, entries), parser.name()))
    }

    /// The job's snapshot, once sources are loaded
    pub fn snapshot(&self) -> Option<Arc<GlossarySnapshot>> {
        self.snapshot.clone()
    }

    /// Cascade lookup, `None` before loading
    pub fn resolve(&self, term: &str, context: Option<&str>) -> Option<&str> {
        self.snapshot.as_ref()?.resolve(term, context)
    }

    /// Substitute resolved terms; the text is returned unchanged before loading
    pub fn apply_to_text(&self, text: &str, context: Option<&str>) -> String {
        match &self.snapshot {
            Some(snapshot) => snapshot.apply_to_text(text, context),
            None => text.to_string(),
        }
    }

    /// Top terms for biasing downstream stages
    pub fn bias_terms(&self, max_count: usize) -> Vec<BiasTerm> {
        self.snapshot
            .as_ref()
            .map(|s| s.bias_terms(max_count))
            .unwrap_or_default()
    }

    /// Bias terms capped by configuration
    pub fn configured_bias_terms(&self) -> Vec<BiasTerm> {
        self.bias_terms(self.config.max_bias_terms)
    }

    /// Counts from the last load plus runtime hits and cache counters
    pub fn statistics(&self) -> GlossaryStatistics {
        let cache = self.cache.statistics();
        GlossaryStatistics {
            load: self.load_stats.clone(),
            term_hits: self.snapshot.as_ref().map_or(0, |s| s.total_hits()),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            ..Default::default()
        }
    }

    /// Write the snapshot atomically to `path`
    pub fn write_snapshot(&self, path: &Path) -> Result<(), ResolverError> {
        let Some(snapshot) = &self.snapshot else {
            return Err(ResolverError::Export {
                path: path.display().to_string(),
                reason: "no glossary loaded".to_string(),
            });
        };
        snapshot.write_to(path).map_err(|e| ResolverError::Export {
            path: path.display().to_string(),
            reason: format!("{:#}", e),
        })
    }

    /// Write the learned source back with this job's hits added to its usage counts.
    ///
    /// Returns the number of entries written; nothing is written when learning
    /// is disabled or no learned source was loaded.
    pub fn export_learned(&self, path: Option<&Path>) -> Result<usize, ResolverError> {
        if !self.config.learning_enabled {
            debug!("Learning disabled, not exporting learned terms");
            return Ok(0);
        }
        let Some(path) = path.or(self.config.learned_terms_path.as_deref()) else {
            return Ok(0);
        };
        let (Some(learned), Some(snapshot)) = (&self.learned, &self.snapshot) else {
            return Ok(0);
        };

        let updated: Vec<TermEntry> = learned
            .entries
            .iter()
            .map(|entry| {
                let hits = snapshot.group_hits(&entry.source, entry.context.as_deref());
                entry.clone().with_usage(entry.usage_count + hits)
            })
            .collect();

        let records: Vec<LearnedRecord> = updated
            .iter()
            .map(|e| LearnedRecord {
                source: &e.source,
                translation: &e.translation,
                context: e.context.as_deref(),
                weight: e.weight,
                usage_count: e.usage_count,
            })
            .collect();

        FileManager::write_json_atomic(path, &records).map_err(|e| ResolverError::Export {
            path: path.display().to_string(),
            reason: format!("{:#}", e),
        })?;

        info!("Exported {} learned terms to {:?}", records.len(), path);
        Ok(records.len())
    }
}
