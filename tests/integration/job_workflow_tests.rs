/*!
 * End-to-end tests for translation jobs.
 *
 * Jobs run against real term files on disk, a metadata provider behind the
 * term cache and mock translation methods.
 */

use chrono::Duration;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use termroute::app_config::Config;
use termroute::file_utils::FileManager;
use termroute::glossary::{Provenance, TermCache, TermSource};
use termroute::pipeline::{ArtifactPaths, TranslationJob};
use termroute::providers::MethodRegistry;
use termroute::providers::mock::MockMethod;
use termroute::routing::FallbackReason;
use termroute::segment::Segment;
use termroute::EngineError;

use crate::common::{self, CountingMetadataProvider, StaggeredMethod};

/// Production, master and learned files for Movie X
fn glossary_config(root: &Path) -> Config {
    common::create_test_file(root, "productions/movie_x_2020.json", r#"{"Rahul": "Raj"}"#).unwrap();
    common::create_test_file(root, "master.tsv", "# master\nyaar\tdude\nRahul\tRahul\n").unwrap();
    common::create_test_file(
        root,
        "learned.json",
        r#"[{"source": "bhai", "translation": "bro", "usage_count": 2}]"#,
    )
    .unwrap();

    let mut config = Config::default();
    config.glossary.production_terms_dir = Some(root.join("productions"));
    config.glossary.master_terms_path = Some(root.join("master.tsv"));
    config.glossary.learned_terms_path = Some(root.join("learned.json"));
    config
}

fn working_methods() -> MethodRegistry {
    MethodRegistry::new()
        .with(Arc::new(MockMethod::working("fast", 0.9)))
        .with(Arc::new(MockMethod::working("contextual", 0.9)))
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&FileManager::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_run_withAllSources_shouldPolishAndWriteArtifacts() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    let config = glossary_config(dir.path());
    let job_dir = dir.path().join("jobs").join("1");
    let cache = Arc::new(TermCache::in_memory(Duration::days(30)));
    let provider = Arc::new(CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO));

    let mut job = TranslationJob::new(common::movie_x(), config, cache, working_methods())
        .unwrap()
        .with_metadata_provider(provider.clone())
        .with_job_dir(&job_dir);

    let outcome = job
        .run(vec![
            Segment::dialogue(1, 3_000, 5_000, ""),
            Segment::dialogue(0, 0, 2_500, "Rahul bhai, yaar"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.decisions.len(), 2);
    assert_eq!(outcome.decisions[0].selected.text, "Raj bro, dude");
    assert_eq!(outcome.decisions[0].selected.raw_text, "Rahul bhai, yaar");
    assert!(outcome.decisions[1].is_passthrough());
    assert_eq!(outcome.report.passthrough_segments, vec![1]);
    assert_eq!(outcome.snapshot.resolve("Rahul", None), Some("Raj"));
    assert_eq!(provider.fetch_count(), 1);

    let paths = ArtifactPaths::new(&job_dir);
    let report = read_json(&paths.quality_report());
    assert_eq!(report["glossary"]["production_terms"], Value::from(1));
    assert_eq!(report["glossary"]["film_specific_terms"], Value::from(1));
    assert_eq!(report["glossary"]["external_terms"], Value::from(4));
    assert_eq!(report["cancelled"], Value::from(false));

    let decisions = read_json(&paths.routing_decisions());
    assert_eq!(decisions.as_array().map(Vec::len), Some(2));
    let snapshot = read_json(&paths.snapshot());
    assert_eq!(snapshot["schema_version"], Value::from(1));
    assert!(FileManager::file_exists(paths.bias_terms()));

    // Learned usage grows by this job's hits
    let learned = read_json(&dir.path().join("learned.json"));
    assert_eq!(learned[0]["usage_count"], Value::from(3));
}

#[tokio::test]
async fn test_run_withCachedExternalTerms_shouldNotRefetch() {
    let dir = common::create_temp_dir().unwrap();
    let cache = Arc::new(TermCache::in_memory(Duration::days(30)));
    let provider = Arc::new(CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO));

    for _ in 0..2 {
        let mut job = TranslationJob::new(common::movie_x(), glossary_config(dir.path()), cache.clone(), working_methods())
            .unwrap()
            .with_metadata_provider(provider.clone());
        job.run(common::dialogue_transcript(2)).await.unwrap();
    }

    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(cache.statistics().hits, 1);
}

#[tokio::test]
async fn test_fromConfig_withConfiguredCacheDb_shouldShareTermsAcrossJobs() {
    let dir = common::create_temp_dir().unwrap();
    let db_path = dir.path().join("cache.db");
    let provider = Arc::new(CountingMetadataProvider::new(common::movie_x_metadata(), StdDuration::ZERO));

    for _ in 0..2 {
        let mut config = glossary_config(dir.path());
        config.glossary.cache_db_path = Some(db_path.clone());
        let mut job = TranslationJob::from_config(common::movie_x(), config, working_methods())
            .unwrap()
            .with_metadata_provider(provider.clone());
        let outcome = job.run(common::dialogue_transcript(1)).await.unwrap();
        assert_eq!(outcome.report.glossary["external_terms"], Value::from(4));
    }

    assert!(db_path.is_file());
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn test_run_withNoSources_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.glossary.master_terms_path = Some(dir.path().join("missing.tsv"));

    let mut job = TranslationJob::new(
        common::movie_x(),
        config,
        Arc::new(TermCache::in_memory(Duration::days(30))),
        working_methods(),
    )
    .unwrap();

    let result = job.run(common::dialogue_transcript(1)).await;
    assert!(matches!(result, Err(EngineError::Resolver(_))));
}

#[tokio::test]
async fn test_run_withOutOfOrderCompletion_shouldKeepTranscriptOrder() {
    let segments = 6;
    let methods = MethodRegistry::new()
        .with(Arc::new(StaggeredMethod::new("fast", segments, StdDuration::from_millis(20))))
        .with(Arc::new(MockMethod::working("contextual", 0.9)));
    let mut config = Config::default();
    config.routing.max_concurrent_segments = segments;

    let mut job = TranslationJob::new(
        common::movie_x(),
        config,
        Arc::new(TermCache::in_memory(Duration::days(30))),
        methods,
    )
    .unwrap()
    .with_source(TermSource::from_pairs("master", Provenance::Master, &[("yaar", "dude")]));

    let mut transcript = common::dialogue_transcript(segments);
    transcript.reverse();
    let outcome = job.run(transcript).await.unwrap();

    let indices: Vec<usize> = outcome.decisions.iter().map(|d| d.segment_index).collect();
    assert_eq!(indices, (0..segments).collect::<Vec<_>>());
    assert_eq!(outcome.decisions[2].selected.text, "Line 2 dude, chalo");
}

#[tokio::test]
async fn test_run_whenCancelledMidway_shouldReturnCompletedPrefix() {
    let methods = MethodRegistry::new()
        .with(Arc::new(MockMethod::slow("fast", 300, 0.9)))
        .with(Arc::new(MockMethod::working("contextual", 0.9)));
    let mut config = Config::default();
    config.routing.max_concurrent_segments = 2;

    let mut job = TranslationJob::new(
        common::movie_x(),
        config,
        Arc::new(TermCache::in_memory(Duration::days(30))),
        methods,
    )
    .unwrap()
    .with_source(TermSource::from_pairs("master", Provenance::Master, &[("yaar", "dude")]));

    let token = job.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(450)).await;
        token.cancel();
    });

    let outcome = job.run(common::dialogue_transcript(10)).await.unwrap();

    let processed = outcome.decisions.len();
    assert!(processed >= 2 && processed < 10, "processed {}", processed);
    let indices: Vec<usize> = outcome.decisions.iter().map(|d| d.segment_index).collect();
    assert_eq!(indices, (0..processed).collect::<Vec<_>>());
    assert!(outcome.report.cancelled);
    assert_eq!(outcome.report.total_segments, 10);
}

#[tokio::test]
async fn test_run_withUnreliableMethods_shouldWarnAboveFailureCeiling() {
    common::init_test_logging();
    let methods = MethodRegistry::new()
        .with(Arc::new(MockMethod::intermittent("fast", 2, 0.9)))
        .with(Arc::new(MockMethod::failing("contextual")));
    let mut config = Config::default();
    config.routing.max_concurrent_segments = 1;

    let mut job = TranslationJob::new(
        common::movie_x(),
        config,
        Arc::new(TermCache::in_memory(Duration::days(30))),
        methods,
    )
    .unwrap()
    .with_source(TermSource::from_pairs("master", Provenance::Master, &[("yaar", "dude")]));

    let outcome = job.run(common::dialogue_transcript(4)).await.unwrap();

    assert_eq!(outcome.report.failed_segments, vec![1, 3]);
    assert_eq!(outcome.report.failure_rate, 0.5);
    assert!(outcome.report.exceeds_failure_ceiling());
    assert!(outcome.report.warnings.iter().any(|w| w.contains("Failure rate")));
    assert_eq!(
        outcome.decisions[1].fallback_reason(),
        Some(FallbackReason::Exhausted)
    );
    assert_eq!(outcome.decisions[1].selected.text, "Line 1 yaar, chalo");
    assert_eq!(outcome.decisions[0].selected.text, "Line 0 dude, chalo");
}
