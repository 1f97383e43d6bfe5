/*!
 * Job quality report.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::glossary::{CacheStatistics, GlossaryStatistics, ProductionKey, StatsSchema};
use crate::routing::{RouterStatsSnapshot, RoutingDecision};

/// Summary of one job, always written even when segments failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub job_id: Uuid,
    pub production: ProductionKey,
    pub generated_at: DateTime<Utc>,

    /// Segments submitted to the job
    pub total_segments: usize,
    /// Segments with a decision in the output
    pub processed_segments: usize,
    pub cancelled: bool,

    /// Mean composite score of the selected candidates
    pub mean_score: f64,
    pub acceptance_threshold: f64,

    /// Segments whose primary scored below the threshold
    pub low_confidence_segments: Vec<usize>,
    /// Segments where the alternate was invoked
    pub fallback_segments: Vec<usize>,
    /// Segments accepted below the threshold
    pub below_threshold_segments: Vec<usize>,
    /// Segments no method could translate
    pub failed_segments: Vec<usize>,
    pub passthrough_segments: Vec<usize>,

    pub failure_rate: f64,
    pub failure_rate_ceiling: f64,
    #[serde(default)]
    pub warnings: Vec<String>,

    pub router: RouterStatsSnapshot,
    /// Glossary statistics in the exported schema, legacy aliases included
    pub glossary: serde_json::Value,
    pub cache: CacheStatistics,
}

/// Inputs of a report besides the decisions
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub job_id: Uuid,
    pub production: ProductionKey,
    pub total_segments: usize,
    pub cancelled: bool,
    pub acceptance_threshold: f64,
    pub failure_rate_ceiling: f64,
    pub router: RouterStatsSnapshot,
    pub glossary: GlossaryStatistics,
    pub cache: CacheStatistics,
}

impl QualityReport {
    pub fn build(context: ReportContext, decisions: &[RoutingDecision]) -> Self {
        let threshold = context.acceptance_threshold;
        let low_confidence_segments = segment_indices(decisions, |d| {
            d.primary
                .as_ref()
                .is_some_and(|p| !p.score.meets_threshold(threshold))
        });
        let fallback_segments = segment_indices(decisions, |d| d.fallback_fired);
        let below_threshold_segments = segment_indices(decisions, |d| !d.met_threshold && !d.is_failed());
        let failed_segments = segment_indices(decisions, RoutingDecision::is_failed);
        let passthrough_segments = segment_indices(decisions, RoutingDecision::is_passthrough);

        let processed_segments = decisions.len();
        let failure_rate = if processed_segments == 0 {
            0.0
        } else {
            failed_segments.len() as f64 / processed_segments as f64
        };
        let mean_score = if processed_segments == 0 {
            0.0
        } else {
            decisions.iter().map(|d| d.selected.score.composite).sum::<f64>() / processed_segments as f64
        };

        let mut warnings = Vec::new();
        if failure_rate > context.failure_rate_ceiling {
            warnings.push(format!(
                "Failure rate {:.1}% exceeds ceiling {:.1}% ({} of {} segments failed)",
                failure_rate * 100.0,
                context.failure_rate_ceiling * 100.0,
                failed_segments.len(),
                processed_segments
            ));
        }
        if context.cancelled {
            warnings.push(format!(
                "Job cancelled after {} of {} segments",
                processed_segments, context.total_segments
            ));
        }

        Self {
            job_id: context.job_id,
            production: context.production,
            generated_at: Utc::now(),
            total_segments: context.total_segments,
            processed_segments,
            cancelled: context.cancelled,
            mean_score,
            acceptance_threshold: threshold,
            low_confidence_segments,
            fallback_segments,
            below_threshold_segments,
            failed_segments,
            passthrough_segments,
            failure_rate,
            failure_rate_ceiling: context.failure_rate_ceiling,
            warnings,
            router: context.router,
            glossary: StatsSchema::export(&context.glossary),
            cache: context.cache,
        }
    }

    pub fn exceeds_failure_ceiling(&self) -> bool {
        self.failure_rate > self.failure_rate_ceiling
    }
}

fn segment_indices(decisions: &[RoutingDecision], pred: impl Fn(&RoutingDecision) -> bool) -> Vec<usize> {
    decisions.iter().filter(|d| pred(d)).map(|d| d.segment_index).collect()
}
