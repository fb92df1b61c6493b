use thiserror::Error;

use crate::llm::LlmError;

/// Configuration problems. These are fatal: no retry can fix them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported LLM provider: {0} (expected \"openai\" or \"gemini\")")]
    UnknownProvider(String),

    #[error("{var} environment variable not set (required for {provider})")]
    MissingApiKey { provider: String, var: String },

    #[error("API key for {0} is empty")]
    EmptyApiKey(String),

    #[error("model name must not be empty")]
    EmptyModel,

    #[error("attempt ceiling must be at least 1")]
    ZeroAttempts,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors surfaced by an alignment run
#[derive(Debug, Error)]
pub enum AlignError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every attempt failed before the model produced any reply
    #[error("no LLM response after {attempts} attempt(s): {source}")]
    Llm {
        attempts: u32,
        #[source]
        source: LlmError,
    },
}
