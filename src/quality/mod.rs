/*!
 * Quality estimation for translation candidates.
 *
 * - **Signals**: length ratio, repetition and diversity of a translated text
 * - **Scorer**: weighted composite of the signals plus method and classification confidence
 */

pub mod scorer;
pub mod signals;

// Re-export main types
pub use scorer::{CompositeScore, ConfidenceScorer, ScoreComponents, ScoringWeights, WEIGHT_EPSILON};
