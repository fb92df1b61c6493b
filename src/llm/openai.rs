use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::models::{ContentPart, ConversationLog, MessageContent};

use super::media::{self, extension, is_remote};
use super::{extract_json, JsonSchema, LlmClient, LlmConfig, LlmError};

/// OpenAI chat-completions client
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: config.http_client()?,
            config,
        })
    }

    async fn build_request(
        &self,
        log: &ConversationLog,
        schema: Option<&JsonSchema>,
    ) -> Result<ChatRequest, LlmError> {
        let mut messages = Vec::with_capacity(log.len());

        for message in log.messages() {
            let content = match message.content() {
                MessageContent::Text(text) => ChatContent::Text(text.clone()),
                MessageContent::Parts(parts) => {
                    let mut chat_parts = Vec::with_capacity(parts.len());
                    for part in parts {
                        chat_parts.push(convert_part(part).await?);
                    }
                    ChatContent::Parts(chat_parts)
                }
            };
            messages.push(ChatMessage {
                role: message.role().as_str(),
                content,
            });
        }

        Ok(ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(self.config.temperature),
            max_completion_tokens: Some(self.config.max_tokens),
            response_format: schema.map(|s| ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: s.name.clone(),
                    schema: s.schema.clone(),
                    strict: true,
                },
            }),
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "openai",
                status,
                body,
            });
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        debug!("OpenAI response: {:?}", response);

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn fetch(&self, log: &ConversationLog) -> Result<String, LlmError> {
        let request = self.build_request(log, None).await?;
        self.send(&request).await
    }

    async fn fetch_structured(
        &self,
        log: &ConversationLog,
        schema: &JsonSchema,
    ) -> Result<Option<serde_json::Value>, LlmError> {
        let request = self.build_request(log, Some(schema)).await?;
        let text = self.send(&request).await?;
        let value = extract_json(&text);
        if value.is_none() {
            warn!("OpenAI structured reply is not JSON");
        }
        Ok(value)
    }
}

/// Map one content part onto the chat-completions wire format.
///
/// Audio files go inline as `input_audio`; other media go as `image_url`
/// (remote URLs passed through, local files as data URLs).
async fn convert_part(part: &ContentPart) -> Result<ChatPart, LlmError> {
    match part {
        ContentPart::Text(text) => Ok(ChatPart::Text { text: text.clone() }),
        ContentPart::Media(reference) if is_remote(reference) => {
            if media::guess_mime(reference).starts_with("audio/") {
                return Err(LlmError::Media {
                    reference: reference.clone(),
                    reason: "OpenAI only accepts audio as inline data".to_string(),
                });
            }
            Ok(ChatPart::ImageUrl {
                image_url: ImageUrl {
                    url: reference.clone(),
                    detail: "low",
                },
            })
        }
        ContentPart::Media(reference) => {
            let inline = media::load_inline(reference).await?;
            if inline.is_audio() {
                let format = match extension(reference).as_deref() {
                    Some("mp3") => "mp3",
                    Some("wav") => "wav",
                    other => {
                        return Err(LlmError::Media {
                            reference: reference.clone(),
                            reason: format!(
                                "OpenAI input_audio supports mp3 and wav, not {}",
                                other.unwrap_or("(no extension)")
                            ),
                        });
                    }
                };
                Ok(ChatPart::InputAudio {
                    input_audio: InputAudio {
                        data: inline.data,
                        format,
                    },
                })
            } else {
                Ok(ChatPart::ImageUrl {
                    image_url: ImageUrl {
                        url: inline.data_url(),
                        detail: "low",
                    },
                })
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatPart {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct InputAudio {
    data: String,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use crate::models::ConversationMessage;

    fn client() -> OpenAiClient {
        OpenAiClient::new(LlmConfig::new(Provider::OpenAi, "sk-test", "gpt-4o-audio-preview"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_text_messages_map_roles() {
        let log = ConversationLog::new()
            .append(ConversationMessage::system("rules"))
            .append(ConversationMessage::user("lyrics"))
            .append(ConversationMessage::assistant("attempt"));

        let request = client().build_request(&log, None).await.unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-audio-preview");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "lyrics");
        assert_eq!(json["messages"][2]["role"], "assistant");
        assert!(json.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_local_audio_becomes_input_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"abc").unwrap();

        let log = ConversationLog::new().append(ConversationMessage::user_parts(vec![
            ContentPart::text("listen"),
            ContentPart::media(path.to_str().unwrap()),
        ]));

        let request = client().build_request(&log, None).await.unwrap();
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["messages"][0]["content"];

        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "input_audio");
        assert_eq!(parts[1]["input_audio"]["format"], "mp3");
        assert_eq!(parts[1]["input_audio"]["data"], "YWJj");
    }

    #[tokio::test]
    async fn test_unsupported_audio_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.flac");
        std::fs::write(&path, b"abc").unwrap();

        let log = ConversationLog::new().append(ConversationMessage::user_parts(vec![
            ContentPart::media(path.to_str().unwrap()),
        ]));

        let err = client().build_request(&log, None).await.unwrap_err();
        assert!(matches!(err, LlmError::Media { .. }));
    }

    #[tokio::test]
    async fn test_schema_sets_response_format() {
        let schema = JsonSchema::new("lyrics", serde_json::json!({"type": "object"}));
        let log = ConversationLog::new().append(ConversationMessage::user("x"));

        let request = client().build_request(&log, Some(&schema)).await.unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "lyrics");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }
}
