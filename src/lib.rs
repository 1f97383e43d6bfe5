/*!
 * # termroute - translation quality engine
 *
 * Resolves production terminology, scores translation candidates and routes
 * each transcript segment between a fast method and a context-aware method.
 *
 * ## Architecture
 *
 * - `glossary`: term sources, the TTL term cache and the merged glossary snapshot
 * - `quality`: text signals and the composite confidence scorer
 * - `providers`: the translation method trait, registry and mock methods
 * - `routing`: the per-segment state machine, decisions and router statistics
 * - `pipeline`: translation jobs, cancellation, quality reports and artifacts
 * - `database`: SQLite storage behind the persistent term cache
 * - `app_config`: configuration loading and validation
 * - `errors`: error types
 * - `logging`: the console logger
 * - `file_utils`: atomic file writes
 * - `segment`: transcript segments
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod glossary;
pub mod logging;
pub mod pipeline;
pub mod providers;
pub mod quality;
pub mod routing;
pub mod segment;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{CacheError, ConfigurationError, EngineError, ExhaustionError, MethodInvocationError, ResolverError, SourceError};
pub use glossary::{GlossarySnapshot, ProductionKey, Provenance, TermCache, TermEntry, TermResolver, TermSource};
pub use pipeline::{CancellationToken, JobOutcome, QualityReport, TranslationJob};
pub use providers::{MethodOutput, MethodRegistry, TranslationMethod};
pub use quality::{CompositeScore, ConfidenceScorer, ScoringWeights};
pub use routing::{FallbackReason, RoutingDecision, TranslationRouter};
pub use segment::{Segment, SegmentKind};
