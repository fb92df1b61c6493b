use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AlignError, ConfigError};
use crate::io::parse_timed_lyrics;
use crate::llm::{
    build_audio_prompt, build_feedback_message, build_transcript_prompt, LlmClient, LlmError,
    TRANSCRIPT_SYSTEM_PROMPT,
};
use crate::models::{
    split_lyrics, ContentPart, ConversationLog, ConversationMessage, LyricLine, TimedLyric,
    TranscriptSegment,
};
use crate::validation::{validate_structure, validate_timing};

/// Configuration for the alignment loop
#[derive(Debug, Clone)]
pub struct AlignConfig {
    /// Maximum number of LLM round-trips per run
    pub max_attempts: u32,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// What the model aligns the lyrics against
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentSource {
    /// Audio clip path or URI, attached as media
    Audio(String),
    /// Speech transcript of the clip, inlined into the prompt
    Transcript(Vec<TranscriptSegment>),
}

/// Progress of a run through one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentState {
    Init,
    Prompted,
    Parsed,
    Validated,
    Retrying,
    Done,
}

/// Trace of one LLM round-trip
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// Blocks parsed from the reply
    pub parsed_rows: usize,
    /// Feedback sent back to the model; `None` if the attempt passed or never got a reply
    pub feedback: Option<String>,
    /// Transport or vendor error, if the call failed
    pub error: Option<String>,
}

/// Result of an alignment run
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub run_id: Uuid,
    /// Accepted lyrics, or the last attempt's lyrics when no attempt passed
    pub lyrics: Vec<TimedLyric>,
    /// Whether `lyrics` passed structural and temporal validation
    pub converged: bool,
    pub attempts: Vec<AttemptRecord>,
    /// Full conversation, including every reply and critique
    pub log: ConversationLog,
}

/// Drives an LLM through prompt → parse → validate → feedback rounds
pub struct Aligner<C = Box<dyn LlmClient>> {
    client: C,
    config: AlignConfig,
}

impl<C: LlmClient> Aligner<C> {
    pub fn new(client: C, config: AlignConfig) -> Result<Self, AlignError> {
        if config.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts.into());
        }
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Align `lyrics` against `source`.
    ///
    /// Runs up to `max_attempts` sequential rounds. Each failed round appends
    /// the model's reply and the validators' feedback to the log before the
    /// next call. When no round passes, the last parsed result is returned
    /// with `converged = false`. Only a run in which no call ever returned
    /// a reply is an error.
    pub async fn run(
        &self,
        lyrics: &str,
        source: &AlignmentSource,
        audio_duration: f64,
    ) -> Result<AlignmentOutcome, AlignError> {
        let run_id = Uuid::new_v4();
        let lines = split_lyrics(lyrics);
        let mut log = build_initial_log(&lines, source);
        let mut state = AlignmentState::Init;
        let mut attempts = Vec::new();

        if lines.is_empty() {
            warn!("Run {}: lyrics are empty, nothing to align", run_id);
            return Ok(AlignmentOutcome {
                run_id,
                lyrics: vec![],
                converged: true,
                attempts,
                log,
            });
        }

        info!(
            "Run {}: aligning {} lyric lines with {} (up to {} attempts, audio {:.3}s)",
            run_id,
            lines.len(),
            self.client.name(),
            self.config.max_attempts,
            audio_duration
        );

        let mut last_parsed: Option<Vec<TimedLyric>> = None;
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                info!(
                    "Run {}: retry {} of {}",
                    run_id,
                    attempt - 1,
                    self.config.max_attempts - 1
                );
            }

            let response = match self.client.fetch(&log).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Run {}: attempt {} failed: {}", run_id, attempt, e);
                    attempts.push(AttemptRecord {
                        attempt,
                        parsed_rows: 0,
                        feedback: None,
                        error: Some(e.to_string()),
                    });
                    last_error = Some(e);
                    continue;
                }
            };
            advance(&mut state, AlignmentState::Prompted, run_id);
            log = log.append(ConversationMessage::assistant(response.as_str()));

            let parsed = parse_timed_lyrics(&response);
            advance(&mut state, AlignmentState::Parsed, run_id);
            debug!(
                "Run {}: parsed {} blocks from {} chars",
                run_id,
                parsed.len(),
                response.len()
            );

            let structural = validate_structure(&lines, &parsed);
            let temporal = validate_timing(audio_duration, &parsed);
            advance(&mut state, AlignmentState::Validated, run_id);

            let Some(feedback) = build_feedback_message(&structural, &temporal) else {
                attempts.push(AttemptRecord {
                    attempt,
                    parsed_rows: parsed.len(),
                    feedback: None,
                    error: None,
                });
                advance(&mut state, AlignmentState::Done, run_id);
                info!("Run {}: attempt {} passed validation", run_id, attempt);
                return Ok(AlignmentOutcome {
                    run_id,
                    lyrics: parsed,
                    converged: true,
                    attempts,
                    log,
                });
            };

            warn!(
                "Run {}: attempt {} failed validation: {:?}",
                run_id,
                attempt,
                structural.errors.iter().chain(&temporal.errors).collect::<Vec<_>>()
            );
            attempts.push(AttemptRecord {
                attempt,
                parsed_rows: parsed.len(),
                feedback: Some(feedback.clone()),
                error: None,
            });
            last_parsed = Some(parsed);

            advance(&mut state, AlignmentState::Retrying, run_id);
            log = log.append(ConversationMessage::user(feedback));
        }

        advance(&mut state, AlignmentState::Done, run_id);

        match last_parsed {
            Some(lyrics) => {
                warn!(
                    "Run {}: no attempt passed validation after {} attempts, returning the last one",
                    run_id, self.config.max_attempts
                );
                Ok(AlignmentOutcome {
                    run_id,
                    lyrics,
                    converged: false,
                    attempts,
                    log,
                })
            }
            None => Err(AlignError::Llm {
                attempts: self.config.max_attempts,
                source: last_error.unwrap_or(LlmError::EmptyResponse),
            }),
        }
    }
}

/// Initial conversation for a run.
///
/// Audio: task and lyrics as one user message, then a user message holding
/// only the audio reference. Transcript: editor rules as a system message,
/// then lyrics and transcript together in one user message.
pub fn build_initial_log(lines: &[LyricLine], source: &AlignmentSource) -> ConversationLog {
    match source {
        AlignmentSource::Audio(reference) => ConversationLog::new()
            .append(ConversationMessage::user(build_audio_prompt(lines)))
            .append(ConversationMessage::user_parts(vec![ContentPart::media(
                reference.as_str(),
            )])),
        AlignmentSource::Transcript(segments) => ConversationLog::new()
            .append(ConversationMessage::system(TRANSCRIPT_SYSTEM_PROMPT))
            .append(ConversationMessage::user(build_transcript_prompt(
                lines, segments,
            ))),
    }
}

fn advance(state: &mut AlignmentState, next: AlignmentState, run_id: Uuid) {
    debug!("Run {}: {:?} -> {:?}", run_id, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::JsonSchema;
    use crate::models::{MessageContent, Role};

    /// Replays canned replies and records every log it is called with
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        seen: Mutex<Vec<ConversationLog>>,
        repeat_last: bool,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(vec![]),
                repeat_last: false,
            }
        }

        fn always(reply: &str) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from(vec![Ok(reply.to_string())])),
                seen: Mutex::new(vec![]),
                repeat_last: true,
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn log_for_call(&self, index: usize) -> ConversationLog {
            self.seen.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, log: &ConversationLog) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(log.clone());
            let mut replies = self.replies.lock().unwrap();
            if self.repeat_last && replies.len() == 1 {
                return match &replies[0] {
                    Ok(text) => Ok(text.clone()),
                    Err(_) => Err(LlmError::EmptyResponse),
                };
            }
            replies.pop_front().unwrap_or(Err(LlmError::EmptyResponse))
        }

        async fn fetch_structured(
            &self,
            _log: &ConversationLog,
            _schema: &JsonSchema,
        ) -> Result<Option<serde_json::Value>, LlmError> {
            Ok(None)
        }
    }

    const LYRICS: &str = "あいうえお\nかきくけこ";

    const VALID: &str = "1\n00:00:01,000-->00:00:02,000\nあいうえお\n\n2\n00:00:03,000-->00:00:04,000\nかきくけこ\n";

    const WRONG_ROW_2: &str = "1\n00:00:01,000 --> 00:00:02,000\nあいうえお\n\n2\n00:00:03,000 --> 00:00:04,000\nかきくけ\n";

    fn audio() -> AlignmentSource {
        AlignmentSource::Audio("downloads/music/song.mp3".to_string())
    }

    fn aligner(client: ScriptedClient, max_attempts: u32) -> Aligner<ScriptedClient> {
        Aligner::new(client, AlignConfig { max_attempts }).unwrap()
    }

    #[tokio::test]
    async fn test_single_attempt_success() {
        let aligner = aligner(ScriptedClient::new(vec![Ok(VALID.to_string())]), 3);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(outcome.converged);
        assert_eq!(
            outcome.lyrics,
            vec![
                TimedLyric::new(1, "あいうえお", Some(1.0), Some(2.0)),
                TimedLyric::new(2, "かきくけこ", Some(3.0), Some(4.0)),
            ]
        );
        assert_eq!(aligner.client.calls(), 1);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.log.len(), 3);
        assert_eq!(outcome.log.last().unwrap().role(), Role::Assistant);
    }

    #[tokio::test]
    async fn test_retry_converges_with_feedback_in_log() {
        let client = ScriptedClient::new(vec![Ok(WRONG_ROW_2.to_string()), Ok(VALID.to_string())]);
        let aligner = aligner(client, 3);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(outcome.converged);
        assert_eq!(aligner.client.calls(), 2);
        assert_eq!(outcome.lyrics[1].text, "かきくけこ");

        let second = aligner.client.log_for_call(1);
        let messages = second.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2], ConversationMessage::assistant(WRONG_ROW_2));
        assert_eq!(messages[3].role(), Role::User);

        let feedback = messages[3].content().all_text();
        assert!(feedback.contains("Row 2 does not match the lyrics"));
        assert!(feedback.contains("Expected: \"かきくけこ\""));
        assert_eq!(outcome.attempts[0].feedback.as_deref(), Some(feedback.as_str()));
    }

    #[tokio::test]
    async fn test_attempt_ceiling_returns_last_result() {
        let replies = (1..=3)
            .map(|i| {
                Ok(format!(
                    "1\n00:00:0{i},000 --> 00:00:0{i},500\nあいうえお\n"
                ))
            })
            .collect();
        let aligner = aligner(ScriptedClient::new(replies), 3);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(!outcome.converged);
        assert_eq!(aligner.client.calls(), 3);
        assert_eq!(
            outcome.lyrics,
            vec![TimedLyric::new(1, "あいうえお", Some(3.0), Some(3.5))]
        );
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts.iter().all(|a| a.feedback.is_some()));
        // 2 initial messages, then one reply and one critique per attempt
        assert_eq!(outcome.log.len(), 8);
        assert_eq!(outcome.log.last().unwrap().role(), Role::User);
    }

    #[tokio::test]
    async fn test_ceiling_is_configurable() {
        let aligner = aligner(ScriptedClient::always("I cannot hear the audio."), 5);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(!outcome.converged);
        assert!(outcome.lyrics.is_empty());
        assert_eq!(aligner.client.calls(), 5);
    }

    #[tokio::test]
    async fn test_temporal_violation_triggers_retry() {
        let overrun = "1\n00:00:01,000 --> 00:00:02,000\nあいうえお\n\n2\n00:00:03,000 --> 00:00:12,000\nかきくけこ\n";
        let client = ScriptedClient::new(vec![Ok(overrun.to_string()), Ok(VALID.to_string())]);
        let aligner = aligner(client, 3);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(outcome.converged);
        assert_eq!(aligner.client.calls(), 2);
        let feedback = outcome.attempts[0].feedback.as_deref().unwrap();
        assert!(feedback.contains("past the end of the audio"));
    }

    #[tokio::test]
    async fn test_zero_attempts_is_a_config_error() {
        let result = Aligner::new(ScriptedClient::new(vec![]), AlignConfig { max_attempts: 0 });

        assert!(matches!(
            result,
            Err(AlignError::Config(ConfigError::ZeroAttempts))
        ));
    }

    #[tokio::test]
    async fn test_transport_error_consumes_attempt_without_touching_log() {
        let client = ScriptedClient::new(vec![
            Err(LlmError::Request("connection reset".to_string())),
            Ok(VALID.to_string()),
        ]);
        let aligner = aligner(client, 3);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(outcome.converged);
        assert_eq!(aligner.client.calls(), 2);
        assert_eq!(aligner.client.log_for_call(0), aligner.client.log_for_call(1));
        assert!(outcome.attempts[0].error.is_some());
    }

    #[tokio::test]
    async fn test_all_calls_failing_is_an_error() {
        let client = ScriptedClient::new(vec![
            Err(LlmError::EmptyResponse),
            Err(LlmError::EmptyResponse),
            Err(LlmError::Request("timeout".to_string())),
        ]);
        let aligner = aligner(client, 3);

        let err = aligner.run(LYRICS, &audio(), 10.0).await.unwrap_err();

        assert!(matches!(
            err,
            AlignError::Llm {
                attempts: 3,
                source: LlmError::Request(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_call_after_reply_keeps_previous_result() {
        let client = ScriptedClient::new(vec![
            Ok(WRONG_ROW_2.to_string()),
            Err(LlmError::EmptyResponse),
        ]);
        let aligner = aligner(client, 2);

        let outcome = aligner.run(LYRICS, &audio(), 10.0).await.unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.lyrics[1].text, "かきくけ");
    }

    #[tokio::test]
    async fn test_empty_lyrics_makes_no_call() {
        let aligner = aligner(ScriptedClient::new(vec![]), 3);

        let outcome = aligner.run("\n  \n", &audio(), 10.0).await.unwrap();

        assert!(outcome.lyrics.is_empty());
        assert_eq!(aligner.client.calls(), 0);
    }

    #[test]
    fn test_audio_initial_log_shape() {
        let lines = split_lyrics(LYRICS);
        let log = build_initial_log(&lines, &audio());

        assert_eq!(log.len(), 2);
        assert!(log.messages().iter().all(|m| m.role() == Role::User));

        let task = log.messages()[0].content().all_text();
        assert!(task.contains("1. あいうえお\n2. かきくけこ\n"));
        assert_eq!(
            log.messages()[1].content(),
            &MessageContent::Parts(vec![ContentPart::media("downloads/music/song.mp3")])
        );
    }

    #[test]
    fn test_transcript_initial_log_shape() {
        let lines = split_lyrics(LYRICS);
        let source = AlignmentSource::Transcript(vec![
            TranscriptSegment::new(1.0, 2.0, "あいうえお"),
            TranscriptSegment::new(3.0, 4.0, "かきくけ"),
        ]);

        let log = build_initial_log(&lines, &source);

        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[0].role(), Role::System);
        let prompt = log.messages()[1].content().all_text();
        assert!(prompt.contains("2. かきくけこ"));
        assert!(prompt.contains("2. 3: かきくけ"));
        assert!(log.media_references().is_empty());
    }
}
