pub mod alignment;
pub mod audio;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod transcript;
pub mod validation;

pub use alignment::{AlignConfig, Aligner, AlignmentOutcome, AlignmentSource, AttemptRecord};
pub use audio::{AudioError, DurationProbe, FixedDuration, SymphoniaProbe};
pub use error::{AlignError, ConfigError};
pub use io::{
    parse_timed_lyrics, read_lyrics_file, read_transcript_file, render_srt, write_srt,
    AlignmentDocument,
};
pub use llm::{
    build_client, CacheConfig, CachedClient, GeminiClient, LlmClient, LlmConfig, LlmError,
    OpenAiClient, Provider,
};
pub use models::{split_lyrics, ConversationLog, ConversationMessage, LyricLine, TimedLyric};
pub use transcript::{JsonTranscriber, Transcriber, TranscriptFilter, DEFAULT_KEEP_PATTERN};
pub use validation::{validate_structure, validate_timing, Validation};
