/*!
 * Tests for the quality signals and composite scorer
 */

use termroute::quality::signals::{diversity, length_ratio_score, repetition_rate, tokenize};
use termroute::quality::{ConfidenceScorer, ScoringWeights};
use termroute::segment::Segment;

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_lengthRatioScore_shouldPenalizeDeviation() {
    assert_close(length_ratio_score("abcd", "abcd"), 1.0);
    assert_close(length_ratio_score("abcd", "ab"), 0.5);
    assert_close(length_ratio_score("abcd", "abcdefghijkl"), 0.0);
    assert_close(length_ratio_score("", "anything"), 1.0);
}

#[test]
fn test_repetitionAndDiversity_withLoopedOutput_shouldBeDegenerate() {
    let tokens = tokenize("La la la la");
    assert_eq!(tokens, vec!["la", "la", "la", "la"]);
    assert_close(repetition_rate(&tokens), 0.75);
    assert_close(diversity(&tokens), 0.25);
}

#[test]
fn test_score_withCleanDialogue_shouldWeightEverySignal() {
    let scorer = ConfidenceScorer::default();
    let segment = Segment::dialogue(0, 0, 1_000, "Kaise ho dost");

    let score = scorer.score(&segment, "Kaise ho dost", Some(0.9));

    assert_close(score.composite, 0.97);
    assert_eq!(score.weakest_signal(), "method_confidence");
}

#[test]
fn test_score_forSungSegment_shouldUseClassificationConfidence() {
    let scorer = ConfidenceScorer::default();
    let segment = Segment::sung(0, 0, 1_000, "Tujhe dekha to", 0.4);

    let score = scorer.score(&segment, "Tujhe dekha to", Some(1.0));

    assert_close(score.components.classification, 0.4);
    assert_close(score.composite, 0.88);
}

#[test]
fn test_score_withNanConfidence_shouldTreatAsZero() {
    let scorer = ConfidenceScorer::default();
    let segment = Segment::dialogue(0, 0, 1_000, "Kaise ho dost");

    let score = scorer.score(&segment, "Kaise ho dost", Some(f64::NAN));

    assert_close(score.components.method_confidence, 0.0);
    assert_close(score.composite, 0.7);
}

#[test]
fn test_scoringWeights_normalized_shouldRescaleExplicitly() {
    let weights = ScoringWeights {
        method: 2.0,
        length: 1.0,
        repetition: 1.0,
        diversity: 0.0,
        classification: 0.0,
    };
    assert!(ConfidenceScorer::new(weights).is_err());

    let normalized = weights.normalized().unwrap();

    assert_close(normalized.method, 0.5);
    assert_close(normalized.length, 0.25);
    assert!(ConfidenceScorer::new(normalized).is_ok());
}
