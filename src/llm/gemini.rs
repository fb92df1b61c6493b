use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::models::{ContentPart, ConversationLog, MessageContent, Role};

use super::media::{self, is_remote};
use super::{extract_json, JsonSchema, LlmClient, LlmConfig, LlmError};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
}

impl GeminiClient {
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
    ) -> Result<GenerateRequest, LlmError> {
        let mut contents = Vec::with_capacity(log.len());

        for message in log.messages() {
            // Gemini has no system turn inside `contents`; system text rides as user text
            let role = match message.role() {
                Role::Assistant => "model",
                Role::System | Role::User => "user",
            };
            let parts = match message.content() {
                MessageContent::Text(text) => vec![Part::Text(text.clone())],
                MessageContent::Parts(parts) => {
                    let mut converted = Vec::with_capacity(parts.len());
                    for part in parts {
                        converted.push(convert_part(part).await?);
                    }
                    converted
                }
            };
            contents.push(Content { role, parts });
        }

        Ok(GenerateRequest {
            contents,
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: Some(self.config.temperature),
                max_output_tokens: Some(self.config.max_tokens),
                response_mime_type: schema.map(|_| "application/json".to_string()),
                response_schema: schema.map(|s| s.schema.clone()),
            },
        })
    }

    async fn send(&self, request: &GenerateRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url(),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider: "gemini",
                status,
                body,
            });
        }

        let response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        debug!("Gemini response: {:?}", response);

        response.text().ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
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
            warn!("Gemini structured reply is not JSON");
        }
        Ok(value)
    }
}

async fn convert_part(part: &ContentPart) -> Result<Part, LlmError> {
    match part {
        ContentPart::Text(text) => Ok(Part::Text(text.clone())),
        ContentPart::Media(reference) if is_remote(reference) => Ok(Part::FileData(FileData {
            mime_type: media::guess_mime(reference),
            file_uri: reference.clone(),
        })),
        ContentPart::Media(reference) => {
            let inline = media::load_inline(reference).await?;
            Ok(Part::InlineData(InlineData {
                mime_type: inline.mime_type,
                data: inline.data,
            }))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Part {
    Text(String),
    InlineData(InlineData),
    FileData(FileData),
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
