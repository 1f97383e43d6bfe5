/*!
 * Composite confidence scoring for translation candidates.
 *
 * The composite is a weighted sum of five independent signals:
 * - Method confidence: the method's own certainty
 * - Length ratio: penalizes truncated or runaway output
 * - Repetition: penalizes degenerate loops
 * - Diversity: distinct/total tokens
 * - Classification: sung/poetic classification confidence (neutral for dialogue)
 *
 * Scoring never fails. A missing signal degrades to its neutral default.
 */

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::segment::{Segment, SegmentKind};

use super::signals;

/// Tolerance for the weight-sum check.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Weights of the five composite signals.
///
/// A weight set is valid when every weight is finite and non-negative and
/// the sum is 1.0 within `WEIGHT_EPSILON`. Invalid sets are rejected, never
/// silently normalized; use [`ScoringWeights::normalized`] to rescale explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight of the method's own confidence
    #[serde(default = "default_method_weight")]
    pub method: f64,

    /// Weight of the length ratio signal
    #[serde(default = "default_length_weight")]
    pub length: f64,

    /// Weight of the repetition signal
    #[serde(default = "default_repetition_weight")]
    pub repetition: f64,

    /// Weight of the diversity signal
    #[serde(default = "default_diversity_weight")]
    pub diversity: f64,

    /// Weight of the classification confidence
    #[serde(default = "default_classification_weight")]
    pub classification: f64,
}

fn default_method_weight() -> f64 {
    0.3
}

fn default_length_weight() -> f64 {
    0.15
}

fn default_repetition_weight() -> f64 {
    0.2
}

fn default_diversity_weight() -> f64 {
    0.15
}

fn default_classification_weight() -> f64 {
    0.2
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            method: default_method_weight(),
            length: default_length_weight(),
            repetition: default_repetition_weight(),
            diversity: default_diversity_weight(),
            classification: default_classification_weight(),
        }
    }
}

impl ScoringWeights {
    /// Build a weight set, rejecting it if it is not a valid distribution.
    pub fn new(
        method: f64,
        length: f64,
        repetition: f64,
        diversity: f64,
        classification: f64,
    ) -> Result<Self, ConfigurationError> {
        let weights = Self {
            method,
            length,
            repetition,
            diversity,
            classification,
        };
        weights.validate()?;
        Ok(weights)
    }

    fn as_array(&self) -> [(&'static str, f64); 5] {
        [
            ("method", self.method),
            ("length", self.length),
            ("repetition", self.repetition),
            ("diversity", self.diversity),
            ("classification", self.classification),
        ]
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.as_array().iter().map(|(_, w)| w).sum()
    }

    /// Check that the weights form a distribution.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, weight) in self.as_array() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigurationError::InvalidWeights(format!(
                    "weight '{}' must be a finite non-negative number, got {}",
                    name, weight
                )));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ConfigurationError::InvalidWeights(format!(
                "weights must sum to 1.0 (±{}), got {:.6}",
                WEIGHT_EPSILON, sum
            )));
        }
        Ok(())
    }

    /// Rescale the weights so they sum to 1.0.
    pub fn normalized(&self) -> Result<Self, ConfigurationError> {
        let sum = self.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(ConfigurationError::InvalidWeights(format!(
                "cannot normalize weights with sum {}",
                sum
            )));
        }
        Self::new(
            self.method / sum,
            self.length / sum,
            self.repetition / sum,
            self.diversity / sum,
            self.classification / sum,
        )
    }
}

/// Individual signal values, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub method_confidence: f64,
    pub length_ratio: f64,
    pub repetition: f64,
    pub diversity: f64,
    pub classification: f64,
}

impl ScoreComponents {
    /// Every component at its best value.
    pub fn perfect() -> Self {
        Self {
            method_confidence: 1.0,
            length_ratio: 1.0,
            repetition: 1.0,
            diversity: 1.0,
            classification: 1.0,
        }
    }
}

/// Composite score with its breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    /// Weighted composite (0.0 - 1.0)
    pub composite: f64,

    /// Components that produced it
    pub components: ScoreComponents,
}

impl CompositeScore {
    /// Score of an untouched passthrough (empty source).
    pub fn passthrough() -> Self {
        Self {
            composite: 1.0,
            components: ScoreComponents::perfect(),
        }
    }

    /// Score of a segment no method could translate.
    pub fn exhausted() -> Self {
        Self {
            composite: 0.0,
            components: ScoreComponents {
                method_confidence: 0.0,
                length_ratio: 0.0,
                repetition: 0.0,
                diversity: 0.0,
                classification: 0.0,
            },
        }
    }

    /// Check if the composite meets a threshold.
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.composite >= threshold
    }

    /// Name of the lowest scoring component.
    pub fn weakest_signal(&self) -> &'static str {
        let c = &self.components;
        [
            (c.method_confidence, "method_confidence"),
            (c.length_ratio, "length_ratio"),
            (c.repetition, "repetition"),
            (c.diversity, "diversity"),
            (c.classification, "classification"),
        ]
        .iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
    }
}

/// Confidence scorer for translation candidates.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    /// Create a scorer, failing fast on an invalid weight set.
    pub fn new(weights: ScoringWeights) -> Result<Self, ConfigurationError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Weights in use.
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Compute every signal for one candidate.
    pub fn components(&self, segment: &Segment, target: &str, method_confidence: Option<f64>) -> ScoreComponents {
        let tokens = signals::tokenize(target);

        let classification = match segment.kind {
            SegmentKind::Dialogue => 1.0,
            SegmentKind::Sung => sanitize(segment.classification_confidence),
        };

        ScoreComponents {
            method_confidence: method_confidence.map(sanitize).unwrap_or(0.0),
            length_ratio: signals::length_ratio_score(&segment.text, target),
            repetition: 1.0 - signals::repetition_rate(&tokens),
            diversity: signals::diversity(&tokens),
            classification,
        }
    }

    /// Score one candidate.
    pub fn score(&self, segment: &Segment, target: &str, method_confidence: Option<f64>) -> CompositeScore {
        let components = self.components(segment, target, method_confidence);
        let w = &self.weights;

        let composite = w.method * components.method_confidence
            + w.length * components.length_ratio
            + w.repetition * components.repetition
            + w.diversity * components.diversity
            + w.classification * components.classification;

        CompositeScore {
            composite: composite.clamp(0.0, 1.0),
            components,
        }
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }
}

/// NaN becomes 0; everything else is clamped to [0, 1].
fn sanitize(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
