/*!
 * Core glossary types: term entries, ranked sources and production keys.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where a term entry comes from.
///
/// Declaration order is cascade order: earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Curated for this production
    Production,
    /// Derived from the metadata enrichment service
    External,
    /// Global master glossary
    Master,
    /// Learned from previous jobs
    Learned,
}

impl Provenance {
    /// All provenances, highest priority first
    pub const CASCADE: [Provenance; 4] = [
        Provenance::Production,
        Provenance::External,
        Provenance::Master,
        Provenance::Learned,
    ];

    /// Numeric priority, higher wins
    pub fn rank(&self) -> u8 {
        match self {
            Provenance::Production => 4,
            Provenance::External => 3,
            Provenance::Master => 2,
            Provenance::Learned => 1,
        }
    }

    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Production => "production",
            Provenance::External => "external",
            Provenance::Master => "master",
            Provenance::Learned => "learned",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single term with its canonical translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    /// Source term, possibly multi-word
    pub source: String,

    /// Canonical translation
    pub translation: String,

    /// Other accepted renderings, kept for audit only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,

    /// Source the entry was loaded from
    pub provenance: Provenance,

    /// Optional confidence weight (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Optional context tag, e.g. "sung"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Observed usage count carried by the source
    #[serde(default)]
    pub usage_count: u64,
}

impl TermEntry {
    /// Create an entry with no weight, context or usage
    pub fn new(source: &str, translation: &str, provenance: Provenance) -> Self {
        Self {
            source: source.trim().to_string(),
            translation: translation.trim().to_string(),
            alternatives: Vec::new(),
            provenance,
            weight: None,
            context: None,
            usage_count: 0,
        }
    }

    /// Set the context tag
    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.trim().to_lowercase());
        self
    }

    /// Set the weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the usage count
    pub fn with_usage(mut self, usage_count: u64) -> Self {
        self.usage_count = usage_count;
        self
    }

    /// Normalized lookup key
    pub fn key(&self) -> String {
        normalize_term(&self.source)
    }

    /// Entries with an empty side are dropped at load time
    pub fn is_usable(&self) -> bool {
        !self.source.trim().is_empty() && !self.translation.trim().is_empty()
    }
}

/// A set of term entries, as cached for one production
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermSet {
    pub entries: Vec<TermEntry>,
}

impl TermSet {
    pub fn new(entries: Vec<TermEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named, priority-ranked collection of entries
#[derive(Debug, Clone, PartialEq)]
pub struct TermSource {
    /// Display name, e.g. "master" or the file name
    pub name: String,

    /// Priority class of every entry
    pub provenance: Provenance,

    /// Entries in file order
    pub entries: Vec<TermEntry>,
}

impl TermSource {
    /// Build a source, forcing every entry's provenance to the source's
    pub fn new(name: &str, provenance: Provenance, entries: Vec<TermEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter(TermEntry::is_usable)
            .map(|mut e| {
                e.provenance = provenance;
                e
            })
            .collect();
        Self {
            name: name.to_string(),
            provenance,
            entries,
        }
    }

    /// Convenience constructor from `(source, translation)` pairs
    pub fn from_pairs(name: &str, provenance: Provenance, pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|(s, t)| TermEntry::new(s, t, provenance))
            .collect();
        Self::new(name, provenance, entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity of a production: title and release year
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionKey {
    pub title: String,
    pub year: i32,
}

impl ProductionKey {
    pub fn new(title: &str, year: i32) -> Self {
        Self {
            title: title.trim().to_string(),
            year,
        }
    }

    /// Case- and whitespace-insensitive form used for storage
    pub fn normalized(&self) -> String {
        format!("{}|{}", normalize_term(&self.title), self.year)
    }

    /// SHA-256 of the normalized key, used as the storage id
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.normalized().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// File stem used for per-production term files, e.g. `movie_x_2020`
    pub fn file_stem(&self) -> String {
        let slug: String = normalize_term(&self.title)
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}", slug, self.year)
    }
}

impl std::fmt::Display for ProductionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.year)
    }
}

/// Lowercase a single char, keeping a one-to-one char mapping
pub fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .map(|word| word.chars().map(fold_char).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}
