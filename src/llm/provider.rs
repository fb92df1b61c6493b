use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::{GeminiClient, LlmClient, OpenAiClient};

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "gemini")]
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Model used when none is given; both accept audio input
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-audio-preview",
            Provider::Gemini => "gemini-1.5-pro",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com",
            Provider::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Connection and sampling settings for one vendor client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    /// API key (from `OPENAI_API_KEY` / `GEMINI_API_KEY`)
    pub api_key: String,
    pub model: String,
    /// Temperature (lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// Overrides the vendor endpoint (proxies, local mocks)
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Create config for `provider`, reading the API key from the environment
    pub fn from_env(provider: Provider, model: Option<String>) -> Result<Self, ConfigError> {
        let var = provider.api_key_var();
        let api_key = std::env::var(var).map_err(|_| ConfigError::MissingApiKey {
            provider: provider.to_string(),
            var: var.to_string(),
        })?;

        let model = model.unwrap_or_else(|| provider.default_model().to_string());
        let config = Self::new(provider, api_key, model);
        config.validate()?;
        Ok(config)
    }

    /// Create with custom settings
    pub fn new(provider: Provider, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.1,
            max_tokens: 8192,
            base_url: None,
            timeout_secs: 300,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey(self.provider.to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}

/// Build the vendor client selected by `config.provider`.
///
/// Misconfiguration fails here, before any request is sent.
pub fn build_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>, ConfigError> {
    config.validate()?;

    let client: Box<dyn LlmClient> = match config.provider {
        Provider::OpenAi => Box::new(OpenAiClient::new(config.clone())?),
        Provider::Gemini => Box::new(GeminiClient::new(config.clone())?),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" Gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!(matches!(
            "claude".parse::<Provider>(),
            Err(ConfigError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let config = LlmConfig::new(Provider::Gemini, "", "gemini-1.5-pro");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyApiKey(_))));

        let config = LlmConfig::new(Provider::Gemini, "key", "  ");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyModel)));
    }

    #[test]
    fn test_build_client_fails_before_any_call() {
        let config = LlmConfig::new(Provider::OpenAi, "", "gpt-4o-audio-preview");
        assert!(build_client(&config).is_err());
    }

    #[test]
    fn test_build_client_selects_vendor() {
        let openai = build_client(&LlmConfig::new(Provider::OpenAi, "k", "gpt-4o-audio-preview"))
            .unwrap();
        let gemini = build_client(&LlmConfig::new(Provider::Gemini, "k", "gemini-1.5-pro")).unwrap();

        assert_eq!(openai.name(), "openai");
        assert_eq!(gemini.name(), "gemini");
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let mut config = LlmConfig::new(Provider::OpenAi, "k", "m");
        assert_eq!(config.base_url(), "https://api.openai.com");

        config.base_url = Some("http://localhost:8080/".to_string());
        assert_eq!(config.base_url(), "http://localhost:8080");
    }
}
