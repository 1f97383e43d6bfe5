/*!
 * Glossary statistics and their versioned output schema.
 *
 * Statistics have one canonical set of field names. Older consumers read a
 * handful of legacy names; those are produced from an explicit alias map at
 * export time and accepted at import time, never stored as separate fields.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::model::Provenance;

/// Current statistics schema version
pub const STATS_SCHEMA_VERSION: u32 = 2;

/// Legacy field name -> canonical field name
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("film_specific_terms", "production_terms"),
    ("tmdb_terms", "external_terms"),
    ("master_glossary_terms", "master_terms"),
    ("learned_glossary_terms", "learned_terms"),
    ("total_entries", "total_terms"),
    ("glossary_hits", "term_hits"),
];

fn default_schema_version() -> u32 {
    STATS_SCHEMA_VERSION
}

/// Outcome of loading one term source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLoad {
    pub name: String,
    pub provenance: Provenance,
    pub loaded: bool,
    pub terms: usize,
    /// Parser strategy used, for file sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceLoad {
    pub fn loaded(name: &str, provenance: Provenance, terms: usize, parser: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            provenance,
            loaded: true,
            terms,
            parser: parser.map(str::to_string),
            error: None,
        }
    }

    pub fn failed(name: &str, provenance: Provenance, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            provenance,
            loaded: false,
            terms: 0,
            parser: None,
            error: Some(error.to_string()),
        }
    }
}

/// Per-source and aggregate counts from one load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStats {
    #[serde(default)]
    pub production_terms: usize,
    #[serde(default)]
    pub external_terms: usize,
    #[serde(default)]
    pub master_terms: usize,
    #[serde(default)]
    pub learned_terms: usize,
    /// Resolved entries in the merged snapshot
    #[serde(default)]
    pub total_terms: usize,
    /// Distinct source terms in the snapshot, ignoring context tags
    #[serde(default)]
    pub distinct_terms: usize,
    /// Entries that lost the cascade
    #[serde(default)]
    pub shadowed_terms: usize,
    #[serde(default)]
    pub sources_loaded: usize,
    /// Whether the external set was served from the term cache
    #[serde(default)]
    pub external_from_cache: bool,
    #[serde(default)]
    pub sources: Vec<SourceLoad>,
}

impl LoadStats {
    /// Record one source outcome and update the per-provenance counters
    pub fn record(&mut self, load: SourceLoad) {
        if load.loaded {
            self.sources_loaded += 1;
            match load.provenance {
                Provenance::Production => self.production_terms += load.terms,
                Provenance::External => self.external_terms += load.terms,
                Provenance::Master => self.master_terms += load.terms,
                Provenance::Learned => self.learned_terms += load.terms,
            }
        }
        self.sources.push(load);
    }

    /// Terms loaded across every source, before merging
    pub fn loaded_terms(&self) -> usize {
        self.production_terms + self.external_terms + self.master_terms + self.learned_terms
    }
}

/// Resolver statistics as exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryStatistics {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(flatten)]
    pub load: LoadStats,
    /// Substitutions made in this job
    #[serde(default)]
    pub term_hits: u64,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default)]
    pub cache_misses: u64,
}

impl Default for GlossaryStatistics {
    fn default() -> Self {
        Self {
            schema_version: STATS_SCHEMA_VERSION,
            load: LoadStats::default(),
            term_hits: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }
}

/// Versioned statistics schema with its legacy alias map
pub struct StatsSchema;

impl StatsSchema {
    /// Canonical name for a field, resolving legacy aliases
    pub fn canonical_name(field: &str) -> &str {
        LEGACY_ALIASES
            .iter()
            .find(|(legacy, _)| *legacy == field)
            .map_or(field, |(_, canonical)| *canonical)
    }

    /// Export statistics with canonical fields plus every legacy alias
    pub fn export(stats: &GlossaryStatistics) -> Value {
        let mut value = serde_json::to_value(stats).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(map) = &mut value {
            for (legacy, canonical) in LEGACY_ALIASES {
                if let Some(v) = map.get(*canonical).cloned() {
                    map.insert((*legacy).to_string(), v);
                }
            }
        }
        value
    }

    /// Import statistics written by any schema version.
    ///
    /// Legacy names are honoured only when the canonical field is absent.
    pub fn import(value: Value) -> Result<GlossaryStatistics, serde_json::Error> {
        let value = match value {
            Value::Object(mut map) => {
                for (legacy, canonical) in LEGACY_ALIASES {
                    if let Some(v) = map.remove(*legacy) {
                        map.entry((*canonical).to_string()).or_insert(v);
                    }
                }
                Value::Object(map)
            }
            other => other,
        };
        serde_json::from_value(value)
    }
}
