/*!
 * Error types for the termroute engine.
 *
 * Each concern has its own error enum, defined with the thiserror crate.
 * Only configuration errors and "no term source at all" are fatal; every
 * other error is recovered by the component that observes it.
 */

use std::time::Duration;
use thiserror::Error;

/// Invalid configuration detected at startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Scoring weights do not form a valid distribution
    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),

    /// A threshold lies outside [0, 1]
    #[error("Threshold '{name}' must be within [0, 1], got {value}")]
    ThresholdOutOfRange {
        /// Name of the offending option
        name: &'static str,
        /// Supplied value
        value: f64,
    },

    /// Any other option with an invalid value
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue {
        /// Name of the offending option
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The configuration file could not be read or parsed
    #[error("Failed to load configuration from {path}: {reason}")]
    Load {
        /// Path that was being read
        path: String,
        /// Underlying failure
        reason: String,
    },
}

/// Failure of the term cache storage layer
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading a record failed
    #[error("Cache read failed: {0}")]
    Read(String),

    /// Writing or deleting a record failed
    #[error("Cache write failed: {0}")]
    Write(String),

    /// A stored record could not be decoded
    #[error("Cache record is corrupt: {0}")]
    Corrupt(String),
}

/// An optional term source could not be used
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source file does not exist
    #[error("Term source '{name}' not found at {path}")]
    Missing {
        /// Source name
        name: String,
        /// Path that was probed
        path: String,
    },

    /// The source exists but could not be read or parsed
    #[error("Term source '{name}' is unreadable: {reason}")]
    Unreadable {
        /// Source name
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// The metadata enrichment service failed
    #[error("Metadata fetch failed for {key}: {reason}")]
    FetchFailed {
        /// Production key that was requested
        key: String,
        /// Underlying failure
        reason: String,
    },
}

/// Fatal errors raised while building a glossary
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Every term source was missing or unreadable
    #[error("No term source could be loaded for {0}")]
    NoSources(String),

    /// Writing an artifact failed
    #[error("Failed to write {path}: {reason}")]
    Export {
        /// Destination path
        path: String,
        /// Underlying failure
        reason: String,
    },
}

/// A translation method failed to produce a usable candidate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MethodInvocationError {
    /// The method did not answer within the configured timeout
    #[error("Method '{method}' timed out after {timeout:?}")]
    Timeout {
        /// Method identifier
        method: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The method reported an error
    #[error("Method '{method}' failed: {reason}")]
    Failed {
        /// Method identifier
        method: String,
        /// Underlying failure
        reason: String,
    },

    /// The method answered with an empty text for a non-empty source
    #[error("Method '{method}' returned an empty translation")]
    EmptyOutput {
        /// Method identifier
        method: String,
    },

    /// The method is not registered or reports itself unavailable
    #[error("Method '{method}' is unavailable")]
    Unavailable {
        /// Method identifier
        method: String,
    },
}

impl MethodInvocationError {
    /// Identifier of the method that failed
    pub fn method(&self) -> &str {
        match self {
            Self::Timeout { method, .. }
            | Self::Failed { method, .. }
            | Self::EmptyOutput { method }
            | Self::Unavailable { method } => method,
        }
    }
}

/// Every method failed for one segment
#[derive(Error, Debug, Clone, PartialEq)]
#[error("All translation methods failed for segment {segment_index}")]
pub struct ExhaustionError {
    /// Index of the failed segment
    pub segment_index: usize,
    /// Failures in invocation order
    pub failures: Vec<MethodInvocationError>,
}

/// Top-level engine error that wraps all other errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Glossary could not be built
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Writing a job artifact failed
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        Self::Artifact(error.to_string())
    }
}
