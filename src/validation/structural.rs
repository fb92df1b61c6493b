use std::collections::HashSet;

use crate::models::{LyricLine, TimedLyric};

use super::Validation;

/// Check that the output covers every input row exactly once with the right text
///
/// 1. Overall line count
/// 2. Per input row: missing, duplicated, or text differing token-wise
/// 3. Rows the lyrics never had
pub fn validate_structure(input: &[LyricLine], output: &[TimedLyric]) -> Validation {
    let mut errors = Vec::new();

    if input.len() != output.len() {
        errors.push(format!(
            "The lyrics have {} lines but your answer has {} lines. Output every lyric line exactly once.",
            input.len(),
            output.len()
        ));
    }

    for line in input {
        let matches: Vec<&TimedLyric> = output.iter().filter(|l| l.row == line.row).collect();

        match matches.as_slice() {
            [] => errors.push(format!(
                "Row {} is missing. Expected text: \"{}\"",
                line.row, line.text
            )),
            [only] => {
                if !same_tokens(&line.text, &only.text) {
                    errors.push(format!(
                        "Row {} does not match the lyrics. Expected: \"{}\" Actual: \"{}\"",
                        line.row, line.text, only.text
                    ));
                }
            }
            many => errors.push(format!(
                "Row {} appears {} times. Output exactly one line per row.",
                line.row,
                many.len()
            )),
        }
    }

    let known: HashSet<usize> = input.iter().map(|l| l.row).collect();
    let mut reported = HashSet::new();
    for lyric in output {
        if !known.contains(&lyric.row) && reported.insert(lyric.row) {
            errors.push(format!(
                "Row {} does not exist in the lyrics (\"{}\"). Use only the given row numbers.",
                lyric.row, lyric.text
            ));
        }
    }

    Validation::from_errors(errors)
}

/// Compare two strings as whitespace-separated token sequences
fn same_tokens(expected: &str, actual: &str) -> bool {
    expected.split_whitespace().eq(actual.split_whitespace())
}
