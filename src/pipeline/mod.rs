/*!
 * Job orchestration.
 *
 * - `job`: glossary build, concurrent routing, polishing and cancellation
 * - `report`: the per-job quality report
 * - `artifacts`: artifact layout and atomic writers
 */

pub mod artifacts;
pub mod job;
pub mod report;

pub use artifacts::ArtifactPaths;
pub use job::{JobOutcome, TranslationJob};
pub use report::{QualityReport, ReportContext};
pub use tokio_util::sync::CancellationToken;
