use std::sync::LazyLock;

use regex::Regex;

use crate::models::TimedLyric;

/// Index line, `start --> end` line, lyric line.
static BLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(\d+)[ \t]*\r?\n[ \t]*(\d+(?::\d+)*(?:[.,]\d+)?)[ \t]*-->[ \t]*(\d+(?::\d+)*(?:[.,]\d+)?)[ \t]*\r?\n([^\r\n]+)",
    )
    .expect("timed lyric block pattern is valid")
});

/// Parse numbered, time-ranged lyric blocks out of free-form model output.
///
/// Anything that does not match the block layout (preamble, trailing prose,
/// code fences) is skipped. Blocks come back in the order they appear; no
/// sorting by row is done. No matches yields an empty vector.
pub fn parse_timed_lyrics(text: &str) -> Vec<TimedLyric> {
    BLOCK_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let row = caps[1].parse::<usize>().ok()?;
            let start = parse_timestamp(&caps[2])?;
            let end = parse_timestamp(&caps[3])?;
            let lyric = caps[4].trim();
            if lyric.is_empty() {
                return None;
            }
            Some(TimedLyric::new(row, lyric, Some(start), Some(end)))
        })
        .collect()
}

/// Convert `hh:mm:ss,fff` / `hh:mm:ss.fff` (or shorter forms) to seconds.
///
/// Segments are weighted by `60^position` counted from the right, so
/// `mm:ss.fff` and `ss.fff` are accepted too.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let segments: Vec<&str> = timestamp.trim().split(':').collect();
    let mut total = 0.0;

    for (position, segment) in segments.iter().rev().enumerate() {
        let value: f64 = if position == 0 {
            segment.replace(',', ".").parse().ok()?
        } else {
            segment.parse().ok()?
        };
        total += value * 60f64.powi(position as i32);
    }

    Some(total)
}
