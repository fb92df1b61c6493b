use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{TranscriptDocument, TranscriptSegment};

/// Read a lyrics file as raw text
pub fn read_lyrics_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read lyrics file: {:?}", path))
}

/// Read a transcript JSON file (bare array or `{ "segments": [...] }`)
pub fn read_transcript_file(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript file: {:?}", path))?;
    parse_transcript_json(&content)
}

/// Parse transcript JSON into segments
pub fn parse_transcript_json(json: &str) -> Result<Vec<TranscriptSegment>> {
    let document: TranscriptDocument =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;
    Ok(document.into_segments())
}
