/*!
 * Tests for configuration loading and validation
 */

use termroute::app_config::{Config, LogLevel};
use termroute::errors::ConfigurationError;

use crate::common;

#[test]
fn test_loadOrDefault_withMissingFile_shouldReturnDefaults() {
    let dir = common::create_temp_dir().unwrap();

    let config = Config::load_or_default(dir.path().join("absent.json")).unwrap();

    assert_eq!(config.routing.acceptance_threshold, 0.7);
    assert!(config.routing.fallback_enabled);
    assert_eq!(config.glossary.max_bias_terms, 100);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_loadOrDefault_withPartialFile_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"routing": {"acceptance_threshold": 0.8, "max_concurrent_segments": 8}, "log_level": "debug"}"#,
    )
    .unwrap();

    let config = Config::load_or_default(&path).unwrap();

    assert_eq!(config.routing.acceptance_threshold, 0.8);
    assert_eq!(config.routing.max_concurrent_segments, 8);
    assert_eq!(config.routing.primary_method, "fast");
    assert_eq!(config.glossary.cache_ttl_days, 30);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_loadOrDefault_withOutOfRangeThreshold_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"routing": {"classification_threshold": 1.5}}"#,
    )
    .unwrap();

    let result = Config::load_or_default(&path);

    assert!(matches!(
        result,
        Err(ConfigurationError::ThresholdOutOfRange {
            name: "classification_threshold",
            ..
        })
    ));
}

#[test]
fn test_loadOrDefault_withBadWeights_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"scoring": {"method": 0.9, "length": 0.9}}"#,
    )
    .unwrap();

    assert!(matches!(
        Config::load_or_default(&path),
        Err(ConfigurationError::InvalidWeights(_))
    ));
}

#[test]
fn test_loadOrDefault_withMalformedJson_shouldReportPath() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    match Config::load_or_default(&path) {
        Err(ConfigurationError::Load { path: reported, .. }) => assert!(reported.ends_with("conf.json")),
        other => panic!("expected a load error, got {:?}", other),
    }
}

#[test]
fn test_save_thenLoad_shouldKeepValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = Config::default();
    config.routing.fallback_enabled = false;
    config.glossary.learning_enabled = false;

    config.save(&path).unwrap();
    let loaded = Config::load_or_default(&path).unwrap();

    assert!(!loaded.routing.fallback_enabled);
    assert!(!loaded.glossary.learning_enabled);
}
