/*!
 * Translation candidates and routing decisions.
 */

use serde::{Deserialize, Serialize};

use crate::providers::MethodOutput;
use crate::quality::CompositeScore;
use crate::segment::{Segment, SegmentKind};

use super::state::RouteState;

/// Method id recorded for untouched segments
pub const PASSTHROUGH_METHOD: &str = "passthrough";

/// Why the selected candidate is not a plain primary accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Primary scored below the acceptance threshold
    LowConfidence,
    /// Alternate could not be used; primary kept
    AlternateUnavailable,
    /// Primary failed; alternate used directly
    PrimaryUnavailable,
    /// No method produced a candidate
    Exhausted,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::LowConfidence => "low_confidence",
            FallbackReason::AlternateUnavailable => "alternate_unavailable",
            FallbackReason::PrimaryUnavailable => "primary_unavailable",
            FallbackReason::Exhausted => "exhausted",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which candidate won a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRole {
    Primary,
    Alternate,
}

/// One method's translation of a segment, scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationCandidate {
    /// Final text, polished with the glossary once selected
    pub text: String,
    /// Text as returned by the method
    pub raw_text: String,
    pub method: String,
    /// Confidence reported by the method, if any
    pub method_confidence: Option<f64>,
    pub score: CompositeScore,
    pub fallback_reason: Option<FallbackReason>,
}

impl TranslationCandidate {
    /// Candidate from a method output
    pub fn from_output(method: &str, output: MethodOutput, score: CompositeScore) -> Self {
        Self {
            text: output.text.clone(),
            raw_text: output.text,
            method: method.to_string(),
            method_confidence: output.confidence,
            score,
            fallback_reason: None,
        }
    }

    /// Source text carried through untouched
    pub fn passthrough(segment: &Segment) -> Self {
        Self {
            text: segment.text.clone(),
            raw_text: segment.text.clone(),
            method: PASSTHROUGH_METHOD.to_string(),
            method_confidence: None,
            score: CompositeScore::passthrough(),
            fallback_reason: None,
        }
    }

    pub fn with_reason(mut self, reason: FallbackReason) -> Self {
        self.fallback_reason = Some(reason);
        self
    }
}

/// The router's outcome for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub segment_index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub kind: SegmentKind,
    pub source_text: String,
    /// The one candidate passed downstream
    pub selected: TranslationCandidate,
    pub fallback_fired: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<TranslationCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<TranslationCandidate>,
    /// Set when both candidates were compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<CandidateRole>,
    /// Whether the selected candidate met the acceptance threshold
    pub met_threshold: bool,
    /// States visited, in order
    pub trace: Vec<RouteState>,
}

impl RoutingDecision {
    /// Decision with only a selected candidate; fields are filled by the router
    pub fn new(segment: &Segment, selected: TranslationCandidate, met_threshold: bool, trace: Vec<RouteState>) -> Self {
        Self {
            segment_index: segment.index,
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            kind: segment.kind,
            source_text: segment.text.clone(),
            selected,
            fallback_fired: false,
            primary: None,
            alternate: None,
            winner: None,
            met_threshold,
            trace,
        }
    }

    /// Decision for a segment no method could translate: source text, score 0
    pub fn exhausted(segment: &Segment) -> Self {
        let selected = TranslationCandidate {
            score: CompositeScore::exhausted(),
            ..TranslationCandidate::passthrough(segment)
        }
        .with_reason(FallbackReason::Exhausted);
        Self::new(
            segment,
            selected,
            false,
            vec![RouteState::Start, RouteState::GaveUp, RouteState::Done],
        )
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        self.selected.fallback_reason
    }

    pub fn is_failed(&self) -> bool {
        self.selected.fallback_reason == Some(FallbackReason::Exhausted)
    }

    pub fn is_passthrough(&self) -> bool {
        self.selected.method == PASSTHROUGH_METHOD && !self.is_failed()
    }
}
