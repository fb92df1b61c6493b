use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use crate::io::read_transcript_file;
use crate::models::TranscriptSegment;

/// Default keep-pattern: latin letters, kana, full-width `！？` and spaces
pub const DEFAULT_KEEP_PATTERN: &str = "[a-zA-Zぁ-んァ-ン！？ ]+";

/// Produces timed segments for an audio clip
pub trait Transcriber {
    fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>>;
}

/// Keeps only the runs of transcript text matching a pattern.
///
/// Speech recognizers emit kanji guesses and stray symbols for sung audio;
/// dropping them gives the aligner cleaner anchors.
#[derive(Debug, Clone)]
pub struct TranscriptFilter {
    pattern: Regex,
}

impl TranscriptFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("Invalid keep pattern: {}", pattern))?;
        Ok(Self { pattern })
    }

    /// Matching runs of `text`, concatenated
    pub fn filter_text(&self, text: &str) -> String {
        self.pattern
            .find_iter(text.trim())
            .map(|m| m.as_str())
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Filter every segment; segments left without text are dropped
    pub fn apply(&self, segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
        segments
            .into_iter()
            .filter_map(|s| {
                let text = self.filter_text(&s.text);
                (!text.is_empty()).then(|| TranscriptSegment { text, ..s })
            })
            .collect()
    }
}

/// Serves a precomputed transcript from a JSON file
#[derive(Debug, Clone)]
pub struct JsonTranscriber {
    path: PathBuf,
    filter: Option<TranscriptFilter>,
}

impl JsonTranscriber {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: TranscriptFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl Transcriber for JsonTranscriber {
    fn transcribe(&self, audio: &Path) -> Result<Vec<TranscriptSegment>> {
        info!(
            "Loading transcript for {:?} from {:?}",
            audio, self.path
        );
        let segments: Vec<TranscriptSegment> = read_transcript_file(&self.path)?
            .into_iter()
            .map(|s| TranscriptSegment {
                start: round_ms(s.start),
                end: round_ms(s.end),
                text: s.text,
            })
            .collect();

        let segments = match &self.filter {
            Some(filter) => filter.apply(segments),
            None => segments,
        };
        info!("Transcript has {} segments", segments.len());
        Ok(segments)
    }
}

fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
