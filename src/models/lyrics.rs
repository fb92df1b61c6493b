use serde::{Deserialize, Serialize};

/// One non-blank input lyric line with its 1-based row number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LyricLine {
    pub row: usize,
    pub text: String,
}

impl LyricLine {
    pub fn new(row: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            text: text.into(),
        }
    }
}

/// Split raw lyrics into numbered lines.
///
/// Whitespace-only lines are dropped and do not consume a row number.
pub fn split_lyrics(lyrics: &str) -> Vec<LyricLine> {
    lyrics
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| LyricLine::new(i + 1, line))
        .collect()
}

/// A lyric line annotated with optional start/end times in seconds.
///
/// `None` means the model did not time this line; callers must tolerate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLyric {
    #[serde(rename = "lyrics_row")]
    pub row: usize,
    #[serde(rename = "lyrics")]
    pub text: String,
    #[serde(rename = "start_second")]
    pub start: Option<f64>,
    #[serde(rename = "end_second")]
    pub end: Option<f64>,
}

impl TimedLyric {
    pub fn new(row: usize, text: impl Into<String>, start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            row,
            text: text.into(),
            start,
            end,
        }
    }
}
