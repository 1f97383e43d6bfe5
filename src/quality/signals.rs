/*!
 * Independent text signals used by the confidence scorer.
 *
 * Every function here is total: degenerate input (empty text, zero-length
 * source) maps to a neutral value instead of an error.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Word tokens, unicode-aware
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}']+").expect("valid token pattern")
});

/// How many preceding tokens are inspected for near-immediate repeats.
pub const REPEAT_WINDOW: usize = 2;

/// Split text into lowercase word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// `1 - clip(|target/source - 1|, 0, 1)`, measured in characters.
///
/// A zero-length source carries no information and scores 1.0.
pub fn length_ratio_score(source: &str, target: &str) -> f64 {
    let source_len = source.trim().chars().count();
    if source_len == 0 {
        return 1.0;
    }
    let target_len = target.trim().chars().count();
    let ratio = target_len as f64 / source_len as f64;
    1.0 - (ratio - 1.0).abs().clamp(0.0, 1.0)
}

/// Fraction of tokens that repeat one of the `REPEAT_WINDOW` preceding tokens.
pub fn repetition_rate(tokens: &[String]) -> f64 {
    if tokens.len() < 2 {
        return 0.0;
    }

    let repeats = tokens
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(i, token)| {
            let start = i.saturating_sub(REPEAT_WINDOW);
            tokens[start..*i].iter().any(|prev| prev == *token)
        })
        .count();

    repeats as f64 / tokens.len() as f64
}

/// `distinct / total` tokens; an empty token list is neutral (1.0).
pub fn diversity(tokens: &[String]) -> f64 {
    if tokens.is_empty() {
        return 1.0;
    }
    let distinct: HashSet<&String> = tokens.iter().collect();
    distinct.len() as f64 / tokens.len() as f64
}
