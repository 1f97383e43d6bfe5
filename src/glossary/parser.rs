/*!
 * Term file parsing strategies.
 *
 * Two interchangeable parsers produce the same `TermEntry` structure:
 * - `StructuredParser`: JSON, either an object map `{"term": "translation"}`
 *   or an array of records with `source`/`translation` and optional fields
 * - `LineParser`: one `term<TAB>translation`, `term = translation` or
 *   `term,translation` pair per line, `#` starts a comment
 *
 * The parser is selected once per file by `detect_parser`, which inspects
 * the content instead of attempting a parse and recovering from failure.
 */

use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::model::{Provenance, TermEntry};

/// A term file parsing strategy
pub trait TermFileParser: Send + Sync {
    /// Strategy name for logs and statistics
    fn name(&self) -> &'static str;

    /// Whether this parser understands the given content
    fn supports(&self, content: &str) -> bool;

    /// Parse the content into entries tagged with `provenance`
    fn parse(&self, content: &str, provenance: Provenance) -> Result<Vec<TermEntry>, String>;
}

/// JSON record form accepted by the structured parser
#[derive(Debug, Deserialize)]
struct TermRecord {
    #[serde(alias = "term")]
    source: String,
    translation: String,
    #[serde(default)]
    alternatives: Vec<String>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default, alias = "frequency")]
    usage_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StructuredDocument {
    Records(Vec<TermRecord>),
    Wrapped { terms: Vec<TermRecord> },
    Map(BTreeMap<String, String>),
}

/// JSON parser backed by serde_json
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredParser;

impl TermFileParser for StructuredParser {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn supports(&self, content: &str) -> bool {
        matches!(content.trim_start().chars().next(), Some('{') | Some('['))
    }

    fn parse(&self, content: &str, provenance: Provenance) -> Result<Vec<TermEntry>, String> {
        let document: StructuredDocument = serde_json::from_str(content).map_err(|e| e.to_string())?;

        let entries = match document {
            StructuredDocument::Map(map) => map
                .iter()
                .map(|(source, translation)| TermEntry::new(source, translation, provenance))
                .collect(),
            StructuredDocument::Records(records) | StructuredDocument::Wrapped { terms: records } => records
                .into_iter()
                .map(|r| {
                    let mut entry = TermEntry::new(&r.source, &r.translation, provenance);
                    entry.alternatives = r.alternatives;
                    entry.weight = r.weight;
                    entry.context = r.context.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty());
                    entry.usage_count = r.usage_count;
                    entry
                })
                .collect(),
        };

        Ok(entries)
    }
}

/// Simple line-oriented parser
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl LineParser {
    fn split_line(line: &str) -> Option<(&str, &str)> {
        ['\t', '=', ',']
            .iter()
            .find_map(|sep| line.split_once(*sep))
            .map(|(s, t)| (s.trim(), t.trim()))
            .filter(|(s, t)| !s.is_empty() && !t.is_empty())
    }
}

impl TermFileParser for LineParser {
    fn name(&self) -> &'static str {
        "line"
    }

    fn supports(&self, _content: &str) -> bool {
        true
    }

    fn parse(&self, content: &str, provenance: Provenance) -> Result<Vec<TermEntry>, String> {
        let mut entries = Vec::new();

        for (number, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Self::split_line(line) {
                Some((source, translation)) => entries.push(TermEntry::new(source, translation, provenance)),
                None => debug!("Skipping malformed term line {}: {}", number + 1, line),
            }
        }

        Ok(entries)
    }
}

/// Pick the parser for a file's content.
///
/// The structured parser is preferred; the line parser is the supported
/// fallback for anything that is not JSON.
pub fn detect_parser(content: &str) -> Box<dyn TermFileParser> {
    let structured = StructuredParser;
    if structured.supports(content) {
        Box::new(structured)
    } else {
        debug!("Term file is not structured, using line parser");
        Box::new(LineParser)
    }
}
