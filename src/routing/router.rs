/*!
 * Translation router.
 *
 * Routes one segment through the state machine in `state`: translate with
 * the primary method, score, and either accept or fall back to the alternate
 * and keep the better candidate. The router does not consult the glossary.
 */

use log::{debug, warn};
use std::time::Duration;

use crate::app_config::RoutingConfig;
use crate::errors::{ExhaustionError, MethodInvocationError};
use crate::providers::{MethodOutput, MethodRegistry};
use crate::quality::ConfidenceScorer;
use crate::segment::Segment;

use super::decision::{CandidateRole, FallbackReason, RoutingDecision, TranslationCandidate};
use super::state::{AcceptReason, RoutePolicy, RouteState, ScoredOutcome, choose_methods, compare_scores};
use super::stats::{RouterStats, RouterStatsSnapshot};

/// Per-segment method selection, scoring and fallback
#[derive(Debug)]
pub struct TranslationRouter {
    config: RoutingConfig,
    policy: RoutePolicy,
    scorer: ConfidenceScorer,
    methods: MethodRegistry,
    stats: RouterStats,
}

impl TranslationRouter {
    pub fn new(config: RoutingConfig, scorer: ConfidenceScorer, methods: MethodRegistry) -> Self {
        let policy = RoutePolicy::from(&config);
        Self {
            config,
            policy,
            scorer,
            methods,
            stats: RouterStats::new(),
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    pub fn statistics(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }

    fn timeout(&self) -> Duration {
        self.config.method_timeout()
    }

    /// Route one segment to exactly one selected candidate.
    ///
    /// Returns `ExhaustionError` when neither method produced a candidate.
    pub async fn route(&self, segment: &Segment) -> Result<RoutingDecision, ExhaustionError> {
        self.stats.record_segment();
        let mut trace = vec![RouteState::Start];

        if segment.is_empty() {
            trace.extend([RouteState::Accepted, RouteState::Done]);
            self.stats.record_passthrough();
            self.stats.record_selected(super::decision::PASSTHROUGH_METHOD);
            return Ok(RoutingDecision::new(
                segment,
                TranslationCandidate::passthrough(segment),
                true,
                trace,
            ));
        }

        let (primary_id, alternate_id) = choose_methods(&self.policy, &self.config, segment);
        debug!(
            "Segment {} ({}): primary '{}', alternate '{}'",
            segment.index, segment.kind, primary_id, alternate_id
        );

        let decision = match self.invoke(primary_id, segment).await {
            Ok(output) => {
                trace.push(RouteState::PrimaryTranslated);
                let primary = self.candidate(primary_id, segment, output);
                trace.push(RouteState::Scored);
                self.after_primary(segment, primary, alternate_id, trace).await
            }
            Err(primary_error) => {
                self.stats.record_error();
                warn!("Segment {}: primary method failed: {}", segment.index, primary_error);
                self.after_primary_failure(segment, primary_error, alternate_id, trace)
                    .await?
            }
        };

        self.finish(&decision);
        Ok(decision)
    }

    async fn after_primary(
        &self,
        segment: &Segment,
        primary: TranslationCandidate,
        alternate_id: &str,
        mut trace: Vec<RouteState>,
    ) -> RoutingDecision {
        let primary_score = primary.score.composite;
        if !primary.score.meets_threshold(self.policy.acceptance_threshold) {
            self.stats.record_low_confidence();
        }

        let alternate_available = self.methods.is_available(alternate_id);
        match self.policy.after_primary_scored(primary_score, alternate_available) {
            ScoredOutcome::Accept(reason) => {
                trace.extend([RouteState::Accepted, RouteState::Done]);
                let selected = match reason {
                    AcceptReason::AlternateUnavailable => {
                        debug!(
                            "Segment {}: alternate '{}' unavailable, keeping primary at {:.3}",
                            segment.index, alternate_id, primary_score
                        );
                        primary.clone().with_reason(FallbackReason::AlternateUnavailable)
                    }
                    AcceptReason::MetThreshold | AcceptReason::FallbackDisabled => primary.clone(),
                };
                let met = selected.score.meets_threshold(self.policy.acceptance_threshold);
                let mut decision = RoutingDecision::new(segment, selected, met, trace);
                decision.primary = Some(primary);
                decision
            }
            ScoredOutcome::Fallback => {
                self.stats.record_fallback();
                debug!(
                    "Segment {}: primary scored {:.3} (weakest: {}), trying '{}'",
                    segment.index,
                    primary_score,
                    primary.score.weakest_signal(),
                    alternate_id
                );

                match self.invoke(alternate_id, segment).await {
                    Ok(output) => {
                        trace.push(RouteState::FallbackTranslated);
                        let alternate = self.candidate(alternate_id, segment, output);
                        trace.push(RouteState::FallbackScored);

                        let winner = compare_scores(primary_score, alternate.score.composite);
                        trace.extend([RouteState::Compared, RouteState::Accepted, RouteState::Done]);

                        let selected = match winner {
                            CandidateRole::Primary => primary.clone(),
                            CandidateRole::Alternate => alternate.clone(),
                        }
                        .with_reason(FallbackReason::LowConfidence);
                        let met = selected.score.meets_threshold(self.policy.acceptance_threshold);

                        let mut decision = RoutingDecision::new(segment, selected, met, trace);
                        decision.fallback_fired = true;
                        decision.primary = Some(primary);
                        decision.alternate = Some(alternate);
                        decision.winner = Some(winner);
                        decision
                    }
                    Err(alternate_error) => {
                        self.stats.record_error();
                        warn!(
                            "Segment {}: alternate method failed, keeping primary: {}",
                            segment.index, alternate_error
                        );
                        trace.extend([RouteState::Accepted, RouteState::Done]);
                        let selected = primary.clone().with_reason(FallbackReason::AlternateUnavailable);
                        let met = selected.score.meets_threshold(self.policy.acceptance_threshold);

                        let mut decision = RoutingDecision::new(segment, selected, met, trace);
                        decision.fallback_fired = true;
                        decision.primary = Some(primary);
                        decision
                    }
                }
            }
        }
    }

    async fn after_primary_failure(
        &self,
        segment: &Segment,
        primary_error: MethodInvocationError,
        alternate_id: &str,
        mut trace: Vec<RouteState>,
    ) -> Result<RoutingDecision, ExhaustionError> {
        let mut failures = vec![primary_error];

        match self.invoke(alternate_id, segment).await {
            Ok(output) => {
                self.stats.record_fallback();
                trace.push(RouteState::FallbackTranslated);
                let alternate = self.candidate(alternate_id, segment, output);
                trace.extend([RouteState::FallbackScored, RouteState::Accepted, RouteState::Done]);

                let selected = alternate.clone().with_reason(FallbackReason::PrimaryUnavailable);
                let met = selected.score.meets_threshold(self.policy.acceptance_threshold);

                let mut decision = RoutingDecision::new(segment, selected, met, trace);
                decision.fallback_fired = true;
                decision.alternate = Some(alternate);
                Ok(decision)
            }
            Err(alternate_error) => {
                self.stats.record_error();
                self.stats.record_failed();
                failures.push(alternate_error);
                warn!(
                    "Segment {}: every translation method failed ({} attempts)",
                    segment.index,
                    failures.len()
                );
                Err(ExhaustionError {
                    segment_index: segment.index,
                    failures,
                })
            }
        }
    }

    fn finish(&self, decision: &RoutingDecision) {
        self.stats.record_selected(&decision.selected.method);
        if !decision.met_threshold {
            self.stats.record_below_threshold();
            debug!(
                "Segment {}: accepted below threshold at {:.3}",
                decision.segment_index, decision.selected.score.composite
            );
        }
    }

    fn candidate(&self, method: &str, segment: &Segment, output: MethodOutput) -> TranslationCandidate {
        let score = self.scorer.score(segment, &output.text, output.confidence);
        TranslationCandidate::from_output(method, output, score)
    }

    /// Invoke one method with the configured timeout; empty output is an error
    async fn invoke(&self, method_id: &str, segment: &Segment) -> Result<MethodOutput, MethodInvocationError> {
        let method = self
            .methods
            .get(method_id)
            .filter(|m| m.is_available())
            .ok_or_else(|| MethodInvocationError::Unavailable {
                method: method_id.to_string(),
            })?;

        let timeout = self.timeout();
        let output = match tokio::time::timeout(timeout, method.translate(segment)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(MethodInvocationError::Timeout {
                    method: method_id.to_string(),
                    timeout,
                });
            }
        };

        if output.text.trim().is_empty() {
            return Err(MethodInvocationError::EmptyOutput {
                method: method_id.to_string(),
            });
        }

        Ok(output)
    }
}
