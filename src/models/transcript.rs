use serde::{Deserialize, Serialize};

/// A timed utterance produced by a speech transcriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Transcript file layouts accepted on input: a bare array or a `segments` object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TranscriptDocument {
    Segments(Vec<TranscriptSegment>),
    Wrapped { segments: Vec<TranscriptSegment> },
}

impl TranscriptDocument {
    pub fn into_segments(self) -> Vec<TranscriptSegment> {
        match self {
            TranscriptDocument::Segments(segments) => segments,
            TranscriptDocument::Wrapped { segments } => segments,
        }
    }
}
