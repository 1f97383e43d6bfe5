/*!
 * Terminology resolution.
 *
 * This module contains:
 * - `model`: term entries, sources and production keys
 * - `parser`: structured and line-based term file parsers
 * - `metadata`: production metadata and the enrichment service trait
 * - `cache`: TTL-bound term cache with SQLite and in-memory stores
 * - `snapshot`: the merged, job-scoped glossary
 * - `stats`: load statistics and their versioned schema
 * - `resolver`: source loading and snapshot construction
 */

pub mod cache;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod snapshot;
pub mod stats;

pub use cache::{CacheStatistics, CacheStore, Clock, ManualClock, MemoryCacheStore, SqliteCacheStore, SystemClock, TermCache};
pub use metadata::{CastMember, MetadataProvider, ProductionMetadata, StaticMetadataProvider};
pub use model::{ProductionKey, Provenance, TermEntry, TermSet, TermSource};
pub use parser::{LineParser, StructuredParser, TermFileParser, detect_parser};
pub use resolver::TermResolver;
pub use snapshot::{BiasTerm, GlossarySnapshot, SnapshotDocument};
pub use stats::{GlossaryStatistics, LoadStats, SourceLoad, StatsSchema};
