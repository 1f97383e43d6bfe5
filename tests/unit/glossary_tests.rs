/*!
 * Tests for term parsing, the glossary snapshot and statistics
 */

use serde_json::json;
use termroute::glossary::{
    GlossarySnapshot, Provenance, StatsSchema, TermEntry, TermSource, detect_parser,
};

use crate::common;

fn snapshot(sources: &[TermSource]) -> GlossarySnapshot {
    GlossarySnapshot::build(common::movie_x(), sources)
}

#[test]
fn test_detectParser_shouldPickByContent() {
    assert_eq!(detect_parser(r#"{"yaar": "dude"}"#).name(), "structured");
    assert_eq!(detect_parser("  [{\"source\": \"yaar\", \"translation\": \"dude\"}]").name(), "structured");
    assert_eq!(detect_parser("yaar\tdude\nbhai\tbro").name(), "line");
}

#[test]
fn test_lineParser_shouldSkipCommentsAndMalformedLines() {
    let content = "# master glossary\nyaar\tdude\nnonsense\nbhai = bro\n\nbeta, son\n";
    let entries = detect_parser(content).parse(content, Provenance::Master).unwrap();

    let pairs: Vec<(&str, &str)> = entries
        .iter()
        .map(|e| (e.source.as_str(), e.translation.as_str()))
        .collect();
    assert_eq!(pairs, vec![("yaar", "dude"), ("bhai", "bro"), ("beta", "son")]);
}

#[test]
fn test_structuredParser_shouldReadRecordFields() {
    let content = r#"{"terms": [{"term": "Dil", "translation": "heart", "context": " Sung ", "weight": 2.0, "frequency": 7}]}"#;
    let entries = detect_parser(content).parse(content, Provenance::Learned).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].context.as_deref(), Some("sung"));
    assert_eq!(entries[0].weight, Some(2.0));
    assert_eq!(entries[0].usage_count, 7);
    assert_eq!(entries[0].provenance, Provenance::Learned);
}

#[test]
fn test_applyToText_withMasterTerm_shouldSubstitute() {
    let snapshot = snapshot(&[TermSource::from_pairs("master", Provenance::Master, &[("yaar", "dude")])]);
    assert_eq!(snapshot.apply_to_text("Hey yaar", None), "Hey dude");
}

#[test]
fn test_resolve_withProductionOverride_shouldPreferProduction() {
    let snapshot = snapshot(&[
        TermSource::from_pairs("master", Provenance::Master, &[("Rahul", "Rahul")]),
        TermSource::from_pairs("movie_x_2020", Provenance::Production, &[("Rahul", "Raj")]),
    ]);

    assert_eq!(snapshot.resolve("Rahul", None), Some("Raj"));
    assert_eq!(snapshot.resolve("  rahul ", None), Some("Raj"));
    assert_eq!(snapshot.shadowed_count(), 1);
}

#[test]
fn test_resolve_withSameRank_shouldPreferHigherWeight() {
    let snapshot = snapshot(&[TermSource::new(
        "master",
        Provenance::Master,
        vec![
            TermEntry::new("jaan", "darling", Provenance::Master).with_weight(0.4),
            TermEntry::new("jaan", "sweetheart", Provenance::Master).with_weight(0.9),
        ],
    )]);

    assert_eq!(snapshot.resolve("jaan", None), Some("sweetheart"));
}

#[test]
fn test_applyToText_shouldBeIdempotent() {
    let snapshot = snapshot(&[
        TermSource::from_pairs("master", Provenance::Master, &[("yaar", "dude"), ("bhai", "bro")]),
        TermSource::from_pairs("movie_x_2020", Provenance::Production, &[("Rahul", "Raj")]),
    ]);

    let once = snapshot.apply_to_text("Rahul bhai, yaar!", None);
    let twice = snapshot.apply_to_text(&once, None);

    assert_eq!(once, "Raj bro, dude!");
    assert_eq!(twice, once);
}

#[test]
fn test_applyToText_withOutputStartingLongerMasterTerm_shouldBeIdempotent() {
    let snapshot = snapshot(&[TermSource::from_pairs(
        "master",
        Provenance::Master,
        &[("bhai", "brother"), ("brother in law", "jija")],
    )]);

    let once = snapshot.apply_to_text("bhai in law", None);
    let twice = snapshot.apply_to_text(&once, None);

    assert_eq!(once, "brother in law");
    assert_eq!(twice, once);
}

#[test]
fn test_biasTerms_shouldRankByProvenanceThenFrequency() {
    let snapshot = snapshot(&[
        TermSource::new(
            "learned",
            Provenance::Learned,
            vec![TermEntry::new("bhai", "bro", Provenance::Learned).with_usage(50)],
        ),
        TermSource::new(
            "external",
            Provenance::External,
            vec![
                TermEntry::new("Anjali", "Anjali", Provenance::External).with_usage(1),
                TermEntry::new("Rahul", "Rahul", Provenance::External).with_usage(2),
            ],
        ),
    ]);

    let terms: Vec<String> = snapshot.bias_terms(2).into_iter().map(|t| t.term).collect();
    assert_eq!(terms, vec!["Rahul".to_string(), "Anjali".to_string()]);
}

#[test]
fn test_statsSchema_import_withLegacyKeys_shouldMapToCanonical() {
    let stats = StatsSchema::import(json!({
        "film_specific_terms": 3,
        "tmdb_terms": 4,
        "total_entries": 6,
        "glossary_hits": 9
    }))
    .unwrap();

    assert_eq!(stats.load.production_terms, 3);
    assert_eq!(stats.load.external_terms, 4);
    assert_eq!(stats.load.total_terms, 6);
    assert_eq!(stats.term_hits, 9);
}

#[test]
fn test_statsSchema_export_shouldCarryAliases() {
    let stats = StatsSchema::import(json!({"production_terms": 2, "total_terms": 2})).unwrap();
    let exported = StatsSchema::export(&stats);

    assert_eq!(exported["film_specific_terms"], json!(2));
    assert_eq!(exported["total_entries"], json!(2));
    assert_eq!(StatsSchema::import(exported).unwrap(), stats);
}
