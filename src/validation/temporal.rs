use crate::models::TimedLyric;

use super::Validation;

/// Check that timestamps stay inside the clip and never run backwards.
///
/// Rows without a timestamp are skipped when looking for neighbours. An
/// output with no timestamps at all passes.
pub fn validate_timing(audio_duration: f64, output: &[TimedLyric]) -> Validation {
    let mut errors = Vec::new();

    if let Some(last_end) = output.iter().rev().find_map(|l| l.end) {
        if last_end > audio_duration {
            errors.push(format!(
                "The last end time {:.3}s is past the end of the audio ({:.3}s). Keep every timestamp within the audio.",
                last_end, audio_duration
            ));
        }
    }

    for (i, current) in output.iter().enumerate() {
        let Some(end) = current.end else {
            continue;
        };
        let next = output[i + 1..]
            .iter()
            .find_map(|l| l.start.map(|start| (l, start)));

        if let Some((next, start)) = next {
            if end > start {
                errors.push(format!(
                    "Row {} ends at {:.3}s but row {} starts earlier at {:.3}s. Lines must not overlap.",
                    current.row, end, next.row, start
                ));
            }
        }
    }

    Validation::from_errors(errors)
}
