/*!
 * Tests for file utility functions
 */

use serde_json::{Value, json};
use termroute::file_utils::FileManager;

use crate::common;

#[test]
fn test_fileExists_withDirectory_shouldReturnFalse() {
    let dir = common::create_temp_dir().unwrap();
    assert!(!FileManager::file_exists(dir.path()));
}

#[test]
fn test_ensureDir_withNestedPath_shouldCreateAll() {
    let dir = common::create_temp_dir().unwrap();
    let nested = dir.path().join("a").join("b").join("c");

    FileManager::ensure_dir(&nested).unwrap();
    FileManager::ensure_dir(&nested).unwrap();

    assert!(nested.is_dir());
}

#[test]
fn test_readToString_withMissingFile_shouldMentionPath() {
    let dir = common::create_temp_dir().unwrap();
    let err = FileManager::read_to_string(dir.path().join("missing.tsv")).unwrap_err();
    assert!(format!("{:#}", err).contains("missing.tsv"));
}

#[test]
fn test_writeJsonAtomic_shouldLeaveNoTemporaryFiles() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("report.json");

    FileManager::write_json_atomic(&path, &json!({"failed_segments": [1, 4]})).unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let value: Value = serde_json::from_str(&FileManager::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["failed_segments"], json!([1, 4]));
}
