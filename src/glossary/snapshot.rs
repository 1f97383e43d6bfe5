/*!
 * Glossary snapshot: the merged, job-scoped view over every term source.
 *
 * Entries are grouped by `(normalized source term, context)`. Within a group
 * exactly one entry wins, chosen by the cascade:
 *
 * 1. provenance: production > external > master > learned
 * 2. longer source term
 * 3. higher weight
 * 4. earlier registration (source order, then file order)
 *
 * Losing entries are kept as shadowed entries for audit. The snapshot is
 * immutable once built; the per-entry hit counters are the only interior
 * mutability and never influence a lookup.
 *
 * `apply_to_text` scans left to right and substitutes the longest term
 * starting at each word boundary. Canonical translations already present in
 * the text are opaque: a term match may not start on or run across one, so
 * `"brother"` next to `" in law"` never turns into a `"brother in law"` match.
 * The one exception is an identity entry (`Rahul -> Rahul`), whose output is
 * also raw source text and may begin a longer term. Substituted output is
 * never re-scanned, which makes the operation idempotent.
 */

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::file_utils::FileManager;

use super::model::{ProductionKey, Provenance, TermEntry, TermSource, fold_char, normalize_term};

/// Version of the serialized snapshot document
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct Registered {
    entry: TermEntry,
    order: usize,
}

/// Cascade order; `Less` means `a` wins
fn cascade_cmp(a: &Registered, b: &Registered) -> CmpOrdering {
    b.entry
        .provenance
        .rank()
        .cmp(&a.entry.provenance.rank())
        .then_with(|| b.entry.source.chars().count().cmp(&a.entry.source.chars().count()))
        .then_with(|| {
            let (wa, wb) = (a.entry.weight.unwrap_or(0.0), b.entry.weight.unwrap_or(0.0));
            wb.total_cmp(&wa)
        })
        .then_with(|| a.order.cmp(&b.order))
}

#[derive(Debug)]
struct TermGroup {
    key: String,
    context: Option<String>,
    winner: Registered,
    shadowed: Vec<TermEntry>,
    hits: AtomicU64,
}

#[derive(Debug, Default)]
struct Matcher {
    /// Term patterns by first char, longest first
    terms: HashMap<char, Vec<(Vec<char>, String)>>,
    /// Canonical output patterns by first char, longest first.
    /// The flag is set when every entry producing the output maps it to itself.
    protected: HashMap<char, Vec<(Vec<char>, bool)>>,
}

impl Matcher {
    fn new(groups: &[TermGroup]) -> Self {
        let mut terms: HashMap<char, Vec<(Vec<char>, String)>> = HashMap::new();
        let mut protected: HashMap<char, Vec<(Vec<char>, bool)>> = HashMap::new();

        for group in groups {
            let pattern: Vec<char> = group.key.chars().collect();
            if let Some(&first) = pattern.first() {
                let bucket = terms.entry(first).or_default();
                if !bucket.iter().any(|(_, key)| key == &group.key) {
                    bucket.push((pattern, group.key.clone()));
                }
            }

            let normalized = normalize_term(&group.winner.entry.translation);
            let identity = normalized == group.key;
            let output: Vec<char> = normalized.chars().collect();
            if let Some(&first) = output.first() {
                let bucket = protected.entry(first).or_default();
                match bucket.iter_mut().find(|(pattern, _)| pattern == &output) {
                    Some((_, all_identity)) => *all_identity &= identity,
                    None => bucket.push((output, identity)),
                }
            }
        }

        for bucket in terms.values_mut() {
            bucket.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(&b.1)));
        }
        for bucket in protected.values_mut() {
            bucket.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        }

        Self { terms, protected }
    }

    fn longest_term(&self, text: &[char], at: usize) -> Option<(usize, &str)> {
        self.terms
            .get(&text[at])?
            .iter()
            .find_map(|(pattern, key)| match_at(pattern, text, at).map(|len| (len, key.as_str())))
    }

    fn longest_protected(&self, text: &[char], at: usize) -> Option<usize> {
        self.protected
            .get(&text[at])?
            .iter()
            .find_map(|(pattern, _)| match_at(pattern, text, at))
    }

    /// Whether a non-identity canonical output starts at `at`
    fn is_opaque(&self, text: &[char], at: usize) -> bool {
        self.protected.get(&text[at]).is_some_and(|bucket| {
            bucket
                .iter()
                .any(|(pattern, identity)| !identity && match_at(pattern, text, at).is_some())
        })
    }

    /// A term match over `start..start + len` that covers an opaque output
    fn crosses_opaque(&self, text: &[char], start: usize, len: usize) -> bool {
        (start..start + len).any(|j| starts_word(text, j) && self.is_opaque(text, j))
    }
}

/// Match a folded pattern at `start`; a space in the pattern matches any whitespace run.
/// Returns the matched length in text chars.
fn match_at(pattern: &[char], text: &[char], start: usize) -> Option<usize> {
    let mut pos = start;
    for &p in pattern {
        if p == ' ' {
            if pos >= text.len() || !text[pos].is_whitespace() {
                return None;
            }
            while pos < text.len() && text[pos].is_whitespace() {
                pos += 1;
            }
        } else {
            if pos >= text.len() || text[pos] != p {
                return None;
            }
            pos += 1;
        }
    }

    let last = *pattern.last()?;
    let bounded = pos == text.len() || !last.is_alphanumeric() || !text[pos].is_alphanumeric();
    bounded.then_some(pos - start)
}

fn starts_word(text: &[char], at: usize) -> bool {
    at == 0 || !text[at - 1].is_alphanumeric() || !text[at].is_alphanumeric()
}

/// A term recommended to bias the transcription and translation stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasTerm {
    pub term: String,
    pub translation: String,
    pub provenance: Provenance,
    /// Loaded usage plus hits in this job
    pub frequency: u64,
}

/// An entry that lost the cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowedEntry {
    pub source: String,
    pub translation: String,
    pub provenance: Provenance,
}

/// One resolved `(term, context)` in the serialized snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub source: String,
    pub translation: String,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub usage_count: u64,
    pub hits: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shadowed: Vec<ShadowedEntry>,
}

/// Serializable form of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub schema_version: u32,
    pub production: ProductionKey,
    pub built_at: DateTime<Utc>,
    pub total_terms: usize,
    pub entries: Vec<SnapshotEntry>,
}

/// Merged, immutable glossary for one production
#[derive(Debug)]
pub struct GlossarySnapshot {
    production: ProductionKey,
    built_at: DateTime<Utc>,
    groups: Vec<TermGroup>,
    by_key: HashMap<String, Vec<usize>>,
    matcher: Matcher,
}

impl GlossarySnapshot {
    /// Merge sources into a snapshot. Source order only matters as the last tie-break.
    pub fn build(production: ProductionKey, sources: &[TermSource]) -> Self {
        let mut grouped: BTreeMap<(String, Option<String>), Vec<Registered>> = BTreeMap::new();
        let mut order = 0;

        for source in sources {
            for entry in source.entries.iter().filter(|e| e.is_usable()) {
                let key = entry.key();
                grouped
                    .entry((key, entry.context.clone()))
                    .or_default()
                    .push(Registered { entry: entry.clone(), order });
                order += 1;
            }
        }

        let mut groups = Vec::with_capacity(grouped.len());
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();

        for ((key, context), mut candidates) in grouped {
            candidates.sort_by(cascade_cmp);
            let mut candidates = candidates.into_iter();
            let Some(winner) = candidates.next() else {
                continue;
            };
            let shadowed: Vec<TermEntry> = candidates.map(|c| c.entry).collect();
            if !shadowed.is_empty() {
                debug!(
                    "Term '{}' resolved to {} entry, {} shadowed",
                    key,
                    winner.entry.provenance,
                    shadowed.len()
                );
            }

            by_key.entry(key.clone()).or_default().push(groups.len());
            groups.push(TermGroup {
                key,
                context,
                winner,
                shadowed,
                hits: AtomicU64::new(0),
            });
        }

        let matcher = Matcher::new(&groups);

        Self {
            production,
            built_at: Utc::now(),
            groups,
            by_key,
            matcher,
        }
    }

    /// Snapshot with no terms
    pub fn empty(production: ProductionKey) -> Self {
        Self::build(production, &[])
    }

    pub fn production(&self) -> &ProductionKey {
        &self.production
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Number of resolved `(term, context)` entries
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct source terms regardless of context
    pub fn distinct_terms(&self) -> usize {
        self.by_key.len()
    }

    /// Number of entries that lost the cascade
    pub fn shadowed_count(&self) -> usize {
        self.groups.iter().map(|g| g.shadowed.len()).sum()
    }

    /// Substitutions made through this snapshot so far
    pub fn total_hits(&self) -> u64 {
        self.groups.iter().map(|g| g.hits.load(Ordering::Relaxed)).sum()
    }

    /// Hits recorded for the exact `(term, context)` entry
    pub fn group_hits(&self, term: &str, context: Option<&str>) -> u64 {
        let key = normalize_term(term);
        self.by_key
            .get(&key)
            .into_iter()
            .flatten()
            .map(|&i| &self.groups[i])
            .find(|g| g.context.as_deref() == context)
            .map_or(0, |g| g.hits.load(Ordering::Relaxed))
    }

    /// Case-insensitive cascade lookup.
    ///
    /// At the same priority an entry tagged with `context` beats a context-free
    /// one. Entries tagged with another context are used only when nothing else
    /// matches the term.
    pub fn resolve(&self, term: &str, context: Option<&str>) -> Option<&str> {
        let context = normalize_context(context);
        self.resolve_group(&normalize_term(term), context.as_deref())
            .map(|i| self.groups[i].winner.entry.translation.as_str())
    }

    fn resolve_group(&self, key: &str, context: Option<&str>) -> Option<usize> {
        let affinity = |group: &TermGroup| -> u8 {
            match (group.context.as_deref(), context) {
                (Some(tag), Some(wanted)) if tag == wanted => 2,
                (None, _) => 1,
                _ => 0,
            }
        };

        self.by_key.get(key)?.iter().copied().min_by(|&a, &b| {
            let (ga, gb) = (&self.groups[a], &self.groups[b]);
            let (fa, fb) = (affinity(ga), affinity(gb));
            (fa == 0)
                .cmp(&(fb == 0))
                .then_with(|| gb.winner.entry.provenance.rank().cmp(&ga.winner.entry.provenance.rank()))
                .then_with(|| fb.cmp(&fa))
                .then_with(|| cascade_cmp(&ga.winner, &gb.winner))
        })
    }

    /// Substitute resolved terms in `text`.
    ///
    /// Longest match first, on word boundaries, case-insensitive. Substituted
    /// spans are not matched again and canonical outputs are left as they are,
    /// including when they would form part of a longer term.
    pub fn apply_to_text(&self, text: &str, context: Option<&str>) -> String {
        if self.groups.is_empty() || text.is_empty() {
            return text.to_string();
        }

        let context = normalize_context(context);
        let chars: Vec<char> = text.chars().collect();
        let folded: Vec<char> = chars.iter().map(|&c| fold_char(c)).collect();
        let mut output = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            if starts_word(&folded, i) {
                let term = self.matcher.longest_term(&folded, i);
                let protected = self.matcher.longest_protected(&folded, i);

                let term = term.filter(|(len, _)| {
                    protected.is_none_or(|p| *len > p) && !self.matcher.crosses_opaque(&folded, i, *len)
                });

                if let Some((len, key)) = term {
                    if let Some(group) = self.resolve_group(key, context.as_deref()) {
                        let group = &self.groups[group];
                        output.push_str(&group.winner.entry.translation);
                        group.hits.fetch_add(1, Ordering::Relaxed);
                        i += len;
                        continue;
                    }
                }

                if let Some(len) = protected {
                    output.extend(&chars[i..i + len]);
                    i += len;
                    continue;
                }
            }

            output.push(chars[i]);
            i += 1;
        }

        output
    }

    /// Top terms for biasing downstream stages.
    ///
    /// Ordered by priority, then frequency, then longer term, then alphabetically.
    pub fn bias_terms(&self, max_count: usize) -> Vec<BiasTerm> {
        let mut ranked: Vec<(u8, BiasTerm, &str)> = self
            .by_key
            .iter()
            .filter_map(|(key, indices)| {
                let winner = &self.groups[self.resolve_group(key, None)?].winner.entry;
                let hits: u64 = indices.iter().map(|&i| self.groups[i].hits.load(Ordering::Relaxed)).sum();
                let term = BiasTerm {
                    term: winner.source.clone(),
                    translation: winner.translation.clone(),
                    provenance: winner.provenance,
                    frequency: winner.usage_count + hits,
                };
                Some((winner.provenance.rank(), term, key.as_str()))
            })
            .collect();

        ranked.sort_by(|(ra, a, ka), (rb, b, kb)| {
            rb.cmp(ra)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| kb.chars().count().cmp(&ka.chars().count()))
                .then_with(|| ka.cmp(kb))
        });

        ranked.into_iter().take(max_count).map(|(_, term, _)| term).collect()
    }

    /// Serializable view with provenance and shadowed entries
    pub fn to_document(&self) -> SnapshotDocument {
        let entries = self
            .groups
            .iter()
            .map(|group| {
                let winner = &group.winner.entry;
                SnapshotEntry {
                    key: group.key.clone(),
                    context: group.context.clone(),
                    source: winner.source.clone(),
                    translation: winner.translation.clone(),
                    provenance: winner.provenance,
                    weight: winner.weight,
                    usage_count: winner.usage_count,
                    hits: group.hits.load(Ordering::Relaxed),
                    shadowed: group
                        .shadowed
                        .iter()
                        .map(|e| ShadowedEntry {
                            source: e.source.clone(),
                            translation: e.translation.clone(),
                            provenance: e.provenance,
                        })
                        .collect(),
                }
            })
            .collect();

        SnapshotDocument {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            production: self.production.clone(),
            built_at: self.built_at,
            total_terms: self.groups.len(),
            entries,
        }
    }

    /// Write the serialized snapshot atomically
    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        FileManager::write_json_atomic(path, &self.to_document())?;
        debug!("Wrote glossary snapshot with {} terms to {:?}", self.groups.len(), path);
        Ok(())
    }
}

fn normalize_context(context: Option<&str>) -> Option<String> {
    context.map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty())
}
