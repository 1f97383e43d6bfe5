/*!
 * Transcript segments as delivered by the transcription/classification stage.
 */

use serde::{Deserialize, Serialize};

/// Classification of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Spoken dialogue
    #[default]
    Dialogue,
    /// Sung or poetic content
    Sung,
}

impl SegmentKind {
    /// Lowercase identifier, also used as term context tag
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Dialogue => "dialogue",
            SegmentKind::Sung => "sung",
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-ranged unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the transcript
    pub index: usize,

    /// Start time in milliseconds
    pub start_ms: u64,

    /// End time in milliseconds
    pub end_ms: u64,

    /// Source text
    pub text: String,

    /// Dialogue or sung/poetic
    #[serde(default)]
    pub kind: SegmentKind,

    /// Confidence of the classification (0.0 - 1.0)
    #[serde(default = "default_classification_confidence")]
    pub classification_confidence: f64,
}

fn default_classification_confidence() -> f64 {
    1.0
}

impl Segment {
    /// Create a dialogue segment
    pub fn dialogue(index: usize, start_ms: u64, end_ms: u64, text: &str) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            text: text.to_string(),
            kind: SegmentKind::Dialogue,
            classification_confidence: 1.0,
        }
    }

    /// Create a sung/poetic segment
    pub fn sung(index: usize, start_ms: u64, end_ms: u64, text: &str, classification_confidence: f64) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            text: text.to_string(),
            kind: SegmentKind::Sung,
            classification_confidence,
        }
    }

    /// Whether the source text is blank
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Sort segments into transcript order: start time, then index.
pub fn sort_transcript_order(segments: &mut [Segment]) {
    segments.sort_by(|a, b| a.start_ms.cmp(&b.start_ms).then(a.index.cmp(&b.index)));
}
