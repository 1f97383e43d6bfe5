/*!
 * Tests for the method registry and the translation router
 */

use std::sync::Arc;

use termroute::app_config::RoutingConfig;
use termroute::providers::MethodRegistry;
use termroute::providers::mock::MockMethod;
use termroute::quality::ConfidenceScorer;
use termroute::routing::{CandidateRole, FallbackReason, TranslationRouter, is_valid_trace};
use termroute::segment::Segment;

fn router(primary: MockMethod, alternate: MockMethod) -> TranslationRouter {
    let methods = MethodRegistry::new().with(Arc::new(primary)).with(Arc::new(alternate));
    TranslationRouter::new(RoutingConfig::default(), ConfidenceScorer::default(), methods)
}

#[test]
fn test_methodRegistry_shouldReportAvailability() {
    let registry = MethodRegistry::new()
        .with(Arc::new(MockMethod::working("fast", 0.9)))
        .with(Arc::new(MockMethod::unavailable("contextual")));

    assert_eq!(registry.ids(), vec!["contextual".to_string(), "fast".to_string()]);
    assert!(registry.is_available("fast"));
    assert!(!registry.is_available("contextual"));
    assert!(!registry.is_available("missing"));
}

#[test]
fn test_route_withLoopingPrimary_shouldFallBackAndPreferAlternate() {
    let alternate = MockMethod::working("contextual", 0.9);
    let router = router(MockMethod::repeating("fast", 0.9), alternate.clone());
    let segment = Segment::dialogue(3, 6_000, 8_000, "Mera dil tujhe pukare");

    let decision = tokio_test::block_on(router.route(&segment)).unwrap();

    assert_eq!(decision.selected.method, "contextual");
    assert_eq!(decision.selected.text, "Mera dil tujhe pukare");
    assert_eq!(decision.fallback_reason(), Some(FallbackReason::LowConfidence));
    assert_eq!(decision.winner, Some(CandidateRole::Alternate));
    assert!(decision.met_threshold);
    assert_eq!(alternate.request_count(), 1);
    assert!(is_valid_trace(&decision.trace));
}

#[tokio::test]
async fn test_route_withUnregisteredAlternate_shouldKeepLowPrimary() {
    let methods = MethodRegistry::new().with(Arc::new(MockMethod::repeating("fast", 0.9)));
    let router = TranslationRouter::new(RoutingConfig::default(), ConfidenceScorer::default(), methods);

    let decision = router
        .route(&Segment::dialogue(0, 0, 2_000, "Mera dil tujhe pukare"))
        .await
        .unwrap();

    assert_eq!(decision.selected.method, "fast");
    assert_eq!(decision.fallback_reason(), Some(FallbackReason::AlternateUnavailable));
    assert!(!decision.fallback_fired);
    assert!(!decision.met_threshold);
}

#[tokio::test]
async fn test_route_withIntermittentPrimary_shouldRecordPerMethodCounts() {
    let router = router(
        MockMethod::intermittent("fast", 2, 0.9),
        MockMethod::working("contextual", 0.9),
    );

    let first = router.route(&Segment::dialogue(0, 0, 1_000, "Kaise ho dost")).await.unwrap();
    let second = router.route(&Segment::dialogue(1, 1_000, 2_000, "Chalo chalte hain")).await.unwrap();

    assert_eq!(first.selected.method, "fast");
    assert_eq!(first.fallback_reason(), None);
    assert_eq!(second.selected.method, "contextual");
    assert_eq!(second.fallback_reason(), Some(FallbackReason::PrimaryUnavailable));

    let stats = router.statistics();
    assert_eq!(stats.total_segments, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.per_method.get("fast"), Some(&1));
    assert_eq!(stats.per_method.get("contextual"), Some(&1));
}

#[tokio::test]
async fn test_route_withEmptyOutputEverywhere_shouldExhaust() {
    let router = router(MockMethod::empty("fast"), MockMethod::empty("contextual"));

    let err = router
        .route(&Segment::dialogue(5, 0, 1_000, "Kaise ho dost"))
        .await
        .unwrap_err();

    assert_eq!(err.segment_index, 5);
    assert_eq!(err.failures.len(), 2);
    assert_eq!(router.statistics().failed, 1);
}
