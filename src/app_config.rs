use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::ConfigurationError;
use crate::quality::ScoringWeights;

/// Engine configuration module
/// This module handles the engine configuration including loading,
/// validating and saving configuration settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Glossary and term cache settings
    #[serde(default)]
    pub glossary: GlossaryConfig,

    /// Method routing settings
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Composite score weights
    #[serde(default)]
    pub scoring: ScoringWeights,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Glossary configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GlossaryConfig {
    /// Time-to-live of cached external term sets, in days
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,

    /// SQLite file backing the term cache (default: user data directory)
    #[serde(default)]
    pub cache_db_path: Option<PathBuf>,

    /// Whether the learned term source is loaded and updated
    #[serde(default = "default_true")]
    pub learning_enabled: bool,

    /// Maximum number of terms exported for phonetic biasing
    #[serde(default = "default_max_bias_terms")]
    pub max_bias_terms: usize,

    /// Directory holding per-production term files, named `<title>_<year>.json` or `.tsv`
    #[serde(default)]
    pub production_terms_dir: Option<PathBuf>,

    /// Master glossary file
    #[serde(default)]
    pub master_terms_path: Option<PathBuf>,

    /// Learned glossary file
    #[serde(default)]
    pub learned_terms_path: Option<PathBuf>,
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_days: default_cache_ttl_days(),
            cache_db_path: None,
            learning_enabled: true,
            max_bias_terms: default_max_bias_terms(),
            production_terms_dir: None,
            master_terms_path: None,
            learned_terms_path: None,
        }
    }
}

impl GlossaryConfig {
    /// TTL as a chrono duration
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cache_ttl_days))
    }
}

/// Routing configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoutingConfig {
    /// Minimum composite score accepted without fallback
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,

    /// Whether low-confidence segments are retried with the alternate method
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// Minimum classification confidence for routing a sung segment to the context-aware method
    #[serde(default = "default_classification_threshold")]
    pub classification_threshold: f64,

    /// Fast/local method used for dialogue
    #[serde(default = "default_primary_method")]
    pub primary_method: String,

    /// Context-aware method used for sung segments and as fallback
    #[serde(default = "default_alternate_method")]
    pub alternate_method: String,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_method_timeout_secs")]
    pub method_timeout_secs: u64,

    /// Maximum concurrent translation invocations
    #[serde(default = "default_max_concurrent_segments")]
    pub max_concurrent_segments: usize,

    /// Failed-segment rate above which the job report carries a warning
    #[serde(default = "default_failure_rate_ceiling")]
    pub failure_rate_ceiling: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance_threshold(),
            fallback_enabled: true,
            classification_threshold: default_classification_threshold(),
            primary_method: default_primary_method(),
            alternate_method: default_alternate_method(),
            method_timeout_secs: default_method_timeout_secs(),
            max_concurrent_segments: default_max_concurrent_segments(),
            failure_rate_ceiling: default_failure_rate_ceiling(),
        }
    }
}

impl RoutingConfig {
    /// Invocation timeout as a duration
    pub fn method_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.method_timeout_secs)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_cache_ttl_days() -> u32 {
    30
}

fn default_max_bias_terms() -> usize {
    100
}

fn default_acceptance_threshold() -> f64 {
    0.7
}

fn default_classification_threshold() -> f64 {
    0.5
}

fn default_primary_method() -> String {
    "fast".to_string()
}

fn default_alternate_method() -> String {
    "contextual".to_string()
}

fn default_method_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_segments() -> usize {
    4
}

fn default_failure_rate_ceiling() -> f64 {
    0.2
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the configuration from a JSON file, or fall back to defaults when it does not exist.
    ///
    /// The loaded configuration is validated before it is returned.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let config = if path.exists() {
            let file = File::open(path).map_err(|e| ConfigurationError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader).map_err(|e| ConfigurationError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            debug!("Loaded configuration from {:?}", path);
            config
        } else {
            warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigurationError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| ConfigurationError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_unit_interval("acceptance_threshold", self.routing.acceptance_threshold)?;
        check_unit_interval("classification_threshold", self.routing.classification_threshold)?;
        check_unit_interval("failure_rate_ceiling", self.routing.failure_rate_ceiling)?;

        if self.routing.primary_method.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                name: "primary_method",
                reason: "must not be empty".to_string(),
            });
        }
        if self.routing.primary_method == self.routing.alternate_method {
            return Err(ConfigurationError::InvalidValue {
                name: "alternate_method",
                reason: format!("must differ from primary_method '{}'", self.routing.primary_method),
            });
        }
        if self.routing.max_concurrent_segments == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "max_concurrent_segments",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.routing.method_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "method_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.glossary.cache_ttl_days == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "cache_ttl_days",
                reason: "must be at least 1".to_string(),
            });
        }

        self.scoring.validate()
    }
}

fn check_unit_interval(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::ThresholdOutOfRange { name, value })
    }
}
