use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::models::ConversationLog;

/// Errors from a single LLM round-trip
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport or connection error
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The vendor answered with a non-success status
    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The vendor response body was not the expected JSON
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// A media reference in the log could not be loaded or is unsupported
    #[error("cannot send media {reference}: {reason}")]
    Media { reference: String, reason: String },
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Request(e.to_string())
    }
}

/// Target schema for a structured call
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl JsonSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// One vendor-neutral LLM round-trip over a conversation log.
///
/// Implementors must be `Send + Sync` so a client can be shared behind a
/// `Box<dyn LlmClient>` or `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Free-text completion
    async fn fetch(&self, log: &ConversationLog) -> Result<String, LlmError>;

    /// JSON completion constrained to `schema`; `None` when the reply is not decodable JSON
    async fn fetch_structured(
        &self,
        log: &ConversationLog,
        schema: &JsonSchema,
    ) -> Result<Option<serde_json::Value>, LlmError>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self, log: &ConversationLog) -> Result<String, LlmError> {
        (**self).fetch(log).await
    }

    async fn fetch_structured(
        &self,
        log: &ConversationLog,
        schema: &JsonSchema,
    ) -> Result<Option<serde_json::Value>, LlmError> {
        (**self).fetch_structured(log, schema).await
    }
}

/// Structured call decoded into `T`; `None` when the value does not fit `T`
pub async fn fetch_as<T, C>(
    client: &C,
    log: &ConversationLog,
    schema: &JsonSchema,
) -> Result<Option<T>, LlmError>
where
    T: DeserializeOwned,
    C: LlmClient + ?Sized,
{
    let Some(value) = client.fetch_structured(log, schema).await? else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!("{} reply does not match schema {}: {}", client.name(), schema.name, e);
            Ok(None)
        }
    }
}

/// Pull a JSON value out of model text, tolerating code fences and prose around it
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedJson(serde_json::Value);

    #[async_trait]
    impl LlmClient for FixedJson {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _log: &ConversationLog) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }

        async fn fetch_structured(
            &self,
            _log: &ConversationLog,
            _schema: &JsonSchema,
        ) -> Result<Option<serde_json::Value>, LlmError> {
            Ok(Some(self.0.clone()))
        }
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Answer {
        rows: Vec<usize>,
    }

    #[tokio::test]
    async fn test_fetch_as_decodes_matching_value() {
        let client = FixedJson(serde_json::json!({"rows": [1, 2]}));
        let schema = JsonSchema::new("answer", serde_json::json!({"type": "object"}));

        let answer: Option<Answer> = fetch_as(&client, &ConversationLog::new(), &schema)
            .await
            .unwrap();

        assert_eq!(answer, Some(Answer { rows: vec![1, 2] }));
    }

    #[tokio::test]
    async fn test_fetch_as_mismatch_is_none() {
        let client: Box<dyn LlmClient> = Box::new(FixedJson(serde_json::json!({"rows": "x"})));
        let schema = JsonSchema::new("answer", serde_json::json!({"type": "object"}));

        let answer: Option<Answer> = fetch_as(client.as_ref(), &ConversationLog::new(), &schema)
            .await
            .unwrap();

        assert!(answer.is_none());
    }

    #[test]
    fn test_extract_json_plain_and_fenced() {
        let plain = r#"{"a": 1}"#;
        let fenced = "Here you go:\n```json\n{\"a\": 1}\n```\nDone.";

        assert_eq!(extract_json(plain), Some(serde_json::json!({"a": 1})));
        assert_eq!(extract_json(fenced), Some(serde_json::json!({"a": 1})));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }
}
