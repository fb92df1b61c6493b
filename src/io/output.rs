use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::alignment::AlignmentOutcome;
use crate::models::TimedLyric;

/// Shown in place of a timestamp the model did not provide
pub const UNTIMED_PLACEHOLDER: &str = "--:--:--,---";

/// Machine-readable result of one alignment run
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentDocument {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    /// Whether the returned lyrics passed both validators
    pub converged: bool,
    pub attempts: usize,
    pub lyrics: Vec<TimedLyric>,
}

impl AlignmentDocument {
    pub fn from_outcome(outcome: &AlignmentOutcome, provider: &str, model: &str) -> Self {
        Self {
            run_id: outcome.run_id,
            generated_at: Utc::now(),
            provider: provider.to_string(),
            model: model.to_string(),
            converged: outcome.converged,
            attempts: outcome.attempts.len(),
            lyrics: outcome.lyrics.clone(),
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Format seconds as `hh:mm:ss,fff`; milliseconds are truncated
pub fn format_timestamp(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return UNTIMED_PLACEHOLDER.to_string();
    };

    let total_ms = (seconds.max(0.0) * 1000.0 + 1e-6).floor() as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// One display block: row, time range, lyric text
pub fn render_block(lyric: &TimedLyric) -> String {
    format!(
        "{}\n{} --> {}\n{}",
        lyric.row,
        format_timestamp(lyric.start),
        format_timestamp(lyric.end),
        lyric.text
    )
}

/// All blocks separated by blank lines
pub fn render_srt(lyrics: &[TimedLyric]) -> String {
    let mut output = lyrics
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

/// Write the rendered blocks to a text file
pub fn write_srt(lyrics: &[TimedLyric], path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    write!(file, "{}", render_srt(lyrics))?;
    Ok(())
}
