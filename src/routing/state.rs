/*!
 * Routing state machine.
 *
 * ```text
 * Start -> PrimaryTranslated -> Scored -> Accepted -> Done
 *                                  |          ^
 *                                  v          |
 *              FallbackTranslated -> FallbackScored -> Compared
 * ```
 *
 * A failed primary goes from `Start` straight to `FallbackTranslated`; a
 * segment no method could translate goes `Start -> GaveUp -> Done`.
 * Every decision point is a pure function here so it can be tested without
 * invoking a translation method.
 */

use serde::{Deserialize, Serialize};

use crate::app_config::RoutingConfig;
use crate::segment::{Segment, SegmentKind};

use super::decision::CandidateRole;

/// States a segment passes through while being routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    Start,
    PrimaryTranslated,
    Scored,
    FallbackTranslated,
    FallbackScored,
    Compared,
    Accepted,
    GaveUp,
    Done,
}

impl RouteState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(self, next: RouteState) -> bool {
        use RouteState::*;
        matches!(
            (self, next),
            (Start, PrimaryTranslated)
                | (Start, FallbackTranslated)
                | (Start, Accepted)
                | (Start, GaveUp)
                | (PrimaryTranslated, Scored)
                | (Scored, Accepted)
                | (Scored, FallbackTranslated)
                | (FallbackTranslated, FallbackScored)
                | (FallbackScored, Compared)
                | (FallbackScored, Accepted)
                | (Compared, Accepted)
                | (Accepted, Done)
                | (GaveUp, Done)
        )
    }
}

/// Whether a recorded trace starts at `Start`, ends at `Done` and only takes legal steps
pub fn is_valid_trace(trace: &[RouteState]) -> bool {
    trace.first() == Some(&RouteState::Start)
        && trace.last() == Some(&RouteState::Done)
        && trace.windows(2).all(|w| w[0].can_transition_to(w[1]))
}

/// Why the primary candidate was accepted without comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    MetThreshold,
    FallbackDisabled,
    AlternateUnavailable,
}

/// Transition out of `Scored`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoredOutcome {
    Accept(AcceptReason),
    Fallback,
}

/// Thresholds the transitions depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePolicy {
    pub acceptance_threshold: f64,
    pub fallback_enabled: bool,
    pub classification_threshold: f64,
}

impl From<&RoutingConfig> for RoutePolicy {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            acceptance_threshold: config.acceptance_threshold,
            fallback_enabled: config.fallback_enabled,
            classification_threshold: config.classification_threshold,
        }
    }
}

impl RoutePolicy {
    /// Decide what follows a scored primary.
    ///
    /// Fallback happens iff the score is below the threshold, fallback is
    /// enabled and the alternate is available.
    pub fn after_primary_scored(&self, primary_score: f64, alternate_available: bool) -> ScoredOutcome {
        if primary_score >= self.acceptance_threshold {
            ScoredOutcome::Accept(AcceptReason::MetThreshold)
        } else if !self.fallback_enabled {
            ScoredOutcome::Accept(AcceptReason::FallbackDisabled)
        } else if !alternate_available {
            ScoredOutcome::Accept(AcceptReason::AlternateUnavailable)
        } else {
            ScoredOutcome::Fallback
        }
    }

    /// Whether a segment is routed to the context-aware method first
    pub fn prefers_contextual(&self, segment: &Segment) -> bool {
        segment.kind == SegmentKind::Sung && segment.classification_confidence >= self.classification_threshold
    }
}

/// Pick the higher-scoring candidate; the primary wins ties
pub fn compare_scores(primary: f64, alternate: f64) -> CandidateRole {
    if alternate > primary {
        CandidateRole::Alternate
    } else {
        CandidateRole::Primary
    }
}

/// `(primary, alternate)` method ids for a segment
pub fn choose_methods<'a>(policy: &RoutePolicy, config: &'a RoutingConfig, segment: &Segment) -> (&'a str, &'a str) {
    if policy.prefers_contextual(segment) {
        (config.alternate_method.as_str(), config.primary_method.as_str())
    } else {
        (config.primary_method.as_str(), config.alternate_method.as_str())
    }
}
