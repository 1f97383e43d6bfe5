/*!
 * Translation job: one production, one transcript.
 *
 * A job builds its own glossary snapshot and router, routes every segment on
 * a bounded pool of in-flight invocations, polishes the selected text with
 * the snapshot and writes its artifacts. Results come back in transcript
 * order regardless of completion order.
 *
 * Cancellation stops new invocations. In-flight invocations are abandoned
 * and the output is cut at the first segment without a decision, so it is
 * always a complete prefix of the transcript.
 */

use futures::future;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::Config;
use crate::errors::EngineError;
use crate::glossary::{BiasTerm, GlossarySnapshot, MetadataProvider, ProductionKey, TermCache, TermResolver, TermSource};
use crate::providers::MethodRegistry;
use crate::quality::ConfidenceScorer;
use crate::routing::{RoutingDecision, TranslationRouter};
use crate::segment::{Segment, sort_transcript_order};

use super::artifacts::ArtifactPaths;
use super::report::{QualityReport, ReportContext};

/// Everything a finished job produced
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: Uuid,
    /// One decision per processed segment, in transcript order
    pub decisions: Vec<RoutingDecision>,
    pub bias_terms: Vec<BiasTerm>,
    pub report: QualityReport,
    pub snapshot: Arc<GlossarySnapshot>,
}

/// One translation job
pub struct TranslationJob {
    id: Uuid,
    production: ProductionKey,
    config: Config,
    cache: Arc<TermCache>,
    resolver: TermResolver,
    router: TranslationRouter,
    cancel: CancellationToken,
    artifacts: Option<ArtifactPaths>,
}

impl TranslationJob {
    /// Create a job with its own term cache, opened from `config.glossary`
    pub fn from_config(production: ProductionKey, config: Config, methods: MethodRegistry) -> Result<Self, EngineError> {
        let cache = Arc::new(TermCache::from_config(&config.glossary));
        Self::new(production, config, cache, methods)
    }

    /// Create a job over a cache shared with other jobs, failing on invalid configuration
    pub fn new(
        production: ProductionKey,
        config: Config,
        cache: Arc<TermCache>,
        methods: MethodRegistry,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let scorer = ConfidenceScorer::new(config.scoring)?;
        let resolver = TermResolver::new(config.glossary.clone(), cache.clone());
        let router = TranslationRouter::new(config.routing.clone(), scorer, methods);

        Ok(Self {
            id: Uuid::new_v4(),
            production,
            config,
            cache,
            resolver,
            router,
            cancel: CancellationToken::new(),
            artifacts: None,
        })
    }

    /// Fetch external terms from a metadata service
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.resolver = self.resolver.with_metadata_provider(provider);
        self
    }

    /// Add an in-memory term source
    pub fn with_source(mut self, source: TermSource) -> Self {
        self.resolver = self.resolver.with_source(source);
        self
    }

    /// Write artifacts under `job_dir`
    pub fn with_job_dir<P: AsRef<Path>>(mut self, job_dir: P) -> Self {
        self.artifacts = Some(ArtifactPaths::new(job_dir));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token that cancels this job when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn resolver(&self) -> &TermResolver {
        &self.resolver
    }

    pub fn router(&self) -> &TranslationRouter {
        &self.router
    }

    /// Run the job over a transcript
    pub async fn run(&mut self, mut segments: Vec<Segment>) -> Result<JobOutcome, EngineError> {
        info!(
            "Job {} started for {} with {} segments",
            self.id,
            self.production,
            segments.len()
        );

        self.resolver.load_all_sources(&self.production).await?;
        let snapshot = self
            .resolver
            .snapshot()
            .ok_or_else(|| EngineError::Unknown("glossary snapshot missing after load".to_string()))?;
        let bias_terms = self.resolver.configured_bias_terms();

        sort_transcript_order(&mut segments);
        let total_segments = segments.len();
        let decisions = self.route_all(&segments, &snapshot).await;
        let cancelled = decisions.len() < total_segments;

        let report = QualityReport::build(
            ReportContext {
                job_id: self.id,
                production: self.production.clone(),
                total_segments,
                cancelled,
                acceptance_threshold: self.config.routing.acceptance_threshold,
                failure_rate_ceiling: self.config.routing.failure_rate_ceiling,
                router: self.router.statistics(),
                glossary: self.resolver.statistics(),
                cache: self.cache.statistics(),
            },
            &decisions,
        );

        if report.exceeds_failure_ceiling() {
            warn!(
                "Job {}: {} of {} segments failed ({:.1}%), above the {:.1}% ceiling",
                self.id,
                report.failed_segments.len(),
                report.processed_segments,
                report.failure_rate * 100.0,
                report.failure_rate_ceiling * 100.0
            );
        }
        if cancelled {
            warn!(
                "Job {} cancelled after {} of {} segments",
                self.id,
                decisions.len(),
                total_segments
            );
        }

        if let Some(paths) = &self.artifacts {
            self.write_artifacts(paths, &bias_terms, &decisions, &report)?;
        }

        if !cancelled {
            if let Err(e) = self.resolver.export_learned(None) {
                warn!("Failed to export learned terms: {}", e);
            }
        }

        info!(
            "Job {} finished: {} segments, mean score {:.3}, {} fallbacks, {} failed, term cache hit rate {:.0}%",
            self.id,
            report.processed_segments,
            report.mean_score,
            report.fallback_segments.len(),
            report.failed_segments.len(),
            report.cache.hit_rate() * 100.0
        );

        Ok(JobOutcome {
            job_id: self.id,
            decisions,
            bias_terms,
            report,
            snapshot,
        })
    }

    async fn route_all(&self, segments: &[Segment], snapshot: &GlossarySnapshot) -> Vec<RoutingDecision> {
        let router = &self.router;
        let cancel = &self.cancel;

        stream::iter(segments)
            .map(|segment| async move {
                if cancel.is_cancelled() {
                    return None;
                }

                let routed = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Segment {} abandoned on cancellation", segment.index);
                        return None;
                    }
                    routed = router.route(segment) => routed,
                };

                let decision = match routed {
                    Ok(mut decision) => {
                        polish(&mut decision, snapshot);
                        decision
                    }
                    Err(e) => {
                        error!("{}", e);
                        RoutingDecision::exhausted(segment)
                    }
                };
                Some(decision)
            })
            .buffered(self.config.routing.max_concurrent_segments)
            .take_while(|decision| future::ready(decision.is_some()))
            .filter_map(future::ready)
            .collect()
            .await
    }

    fn write_artifacts(
        &self,
        paths: &ArtifactPaths,
        bias_terms: &[BiasTerm],
        decisions: &[RoutingDecision],
        report: &QualityReport,
    ) -> Result<(), EngineError> {
        let artifact_error = |e: anyhow::Error| EngineError::Artifact(format!("{:#}", e));

        self.resolver.write_snapshot(&paths.snapshot())?;
        paths.write(&paths.bias_terms(), bias_terms).map_err(artifact_error)?;
        paths
            .write(&paths.routing_decisions(), decisions)
            .map_err(artifact_error)?;
        paths.write(&paths.quality_report(), report).map_err(artifact_error)?;

        info!("Job {} artifacts written to {:?}", self.id, paths.root());
        Ok(())
    }
}

/// Apply resolved terminology to the selected text
fn polish(decision: &mut RoutingDecision, snapshot: &GlossarySnapshot) {
    if decision.is_passthrough() || decision.is_failed() {
        return;
    }
    let context = decision.kind.as_str();
    decision.selected.text = snapshot.apply_to_text(&decision.selected.raw_text, Some(context));
}
