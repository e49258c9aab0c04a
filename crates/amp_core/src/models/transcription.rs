//! Word-timed transcription results.
//!
//! All times are seconds from the start of the canonical audio track.

use serde::{Deserialize, Serialize};

/// Full transcription of a track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl TranscriptionResult {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Total number of timed words across all segments.
    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// One lyric line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// One timed word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub start: f64,
    pub end: f64,
    /// Tools emit this as `word`; leading whitespace is common.
    #[serde(alias = "word")]
    pub text: String,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Word duration in seconds, never negative.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}
