use crate::models::{LyricLine, TranscriptSegment};
use crate::validation::Validation;

/// Task prompt for aligning lyrics directly against an attached audio clip
pub const AUDIO_ALIGNMENT_PROMPT: &str = r#"Add timestamps to every line of the lyrics below, matching when each line is sung in the attached audio.

RULES:
1. Output every lyric line exactly once, in order, one block per line.
2. Use the row number of each lyric line as the block number.
3. Copy the lyric text exactly as given. Do not merge, split, or rewrite lines.
4. Timestamps use the format hh:mm:ss,fff and must stay within the audio.
5. A line must end before the next line starts.

OUTPUT FORMAT (blocks separated by a blank line):

1
00:00:10,003 --> 00:00:12,455
あいうえお

2
00:00:12,562 --> 00:00:16,419
かきくけこ

3
00:01:02,110 --> 00:01:08,978
さしすせそ
"#;

/// System prompt for aligning lyrics against an automatic transcript of the song
pub const TRANSCRIPT_SYSTEM_PROMPT: &str = r#"You are a professional editor. Follow the rules and the output format to align the "lyrics" with the "automatic transcript of the song".

RULES:
- Output every lyric line, one block per line, in order, using its row number as the block number.
- Only align a lyric line where more than 50% of its characters match the transcript.
- The transcript contains recognition errors. Infer the intended words and align to the position where the characters match.
- The same line may appear several times in the lyrics. Use the transcript start times and the paragraphs of the lyrics to pick the right position.
- Line breaks in the lyrics and the transcript may differ. Always follow the lyrics.
- Copy the lyric text exactly as given.

OUTPUT FORMAT (blocks separated by a blank line):

1
00:00:10,003 --> 00:00:12,455
あいうえお

2
00:00:12,562 --> 00:00:16,419
かきくけこ
"#;

const FEEDBACK_LEAD_IN: &str = "Your previous answer has the following problems:";

const FEEDBACK_CLOSING: &str =
    "Fix them and output the complete corrected alignment for every lyric line, in the same format.";

/// Numbered lyric block: header line, then `row. text`
pub fn build_lyrics_block(lines: &[LyricLine]) -> String {
    let mut block = String::from("Row. Lyrics\n");
    for line in lines {
        block.push_str(&format!("{}. {}\n", line.row, line.text));
    }
    block
}

/// Numbered transcript block: header line, then `row. start: text`
pub fn build_transcript_block(segments: &[TranscriptSegment]) -> String {
    let mut block = String::from("Row. Start second: Transcript\n");
    for (i, segment) in segments.iter().enumerate() {
        block.push_str(&format!("{}. {}: {}\n", i + 1, segment.start, segment.text));
    }
    block
}

/// User prompt for the audio variant
pub fn build_audio_prompt(lines: &[LyricLine]) -> String {
    format!(
        "{}\n# Lyrics\n{}",
        AUDIO_ALIGNMENT_PROMPT,
        build_lyrics_block(lines)
    )
}

/// User prompt for the transcript variant
pub fn build_transcript_prompt(lines: &[LyricLine], segments: &[TranscriptSegment]) -> String {
    format!(
        "# Lyrics\n{}\n\n# Automatic transcript of the song\n{}",
        build_lyrics_block(lines),
        build_transcript_block(segments)
    )
}

/// Corrective feedback combining both validators; `None` when both passed
pub fn build_feedback_message(structural: &Validation, temporal: &Validation) -> Option<String> {
    if structural.is_valid && temporal.is_valid {
        return None;
    }

    let mut message = String::from(FEEDBACK_LEAD_IN);
    message.push('\n');
    for error in structural.errors.iter().chain(temporal.errors.iter()) {
        message.push_str("- ");
        message.push_str(error);
        message.push('\n');
    }
    message.push_str(FEEDBACK_CLOSING);
    Some(message)
}
