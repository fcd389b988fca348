#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use reqwest::{
    blocking::Client,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use super::{AiProvider, ProviderError, api_error_message, apply_defaults};
use crate::{
    config::{AiProviderConfig, ProviderType},
    constants::OPENAI_DEFAULT_BASE_URL,
    grade::GradingPrompt,
};

/// Request body for `POST {base_url}/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model:       String,
    /// System message followed by the user message.
    pub messages:    Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub max_tokens:  u32,
}

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`.
    pub role:    String,
    /// Message text; absent for some non-text replies.
    pub content: Option<String>,
}

/// Response body of a chat completion.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated alternatives; grading only asks for one.
    pub choices: Vec<Choice>,
}

/// One generated alternative.
#[derive(Debug, Deserialize)]
pub struct Choice {
    /// The generated message.
    pub message: ChatMessage,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if it has any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// Grades through OpenAI or any service exposing the same chat-completions
/// API.
#[derive(Debug)]
pub struct OpenAiProvider {
    /// Validated configuration; `base_url` is always set.
    config: AiProviderConfig,
    /// Blocking HTTP client with reqwest's default timeout.
    http:   Client,
}

impl OpenAiProvider {
    /// Validates `config` and prepares an HTTP client.
    pub fn new(config: AiProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to construct HTTP client: {e}")))?;

        let mut provider = Self { config, http };
        provider.validate_config()?;
        Ok(provider)
    }

    /// Chat-completions endpoint under the configured base URL.
    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// The request body for `prompt`.
    fn request(&self, prompt: &GradingPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model:       self.config.model.clone(),
            messages:    vec![
                ChatMessage {
                    role:    "system".into(),
                    content: Some(prompt.system.clone()),
                },
                ChatMessage {
                    role:    "user".into(),
                    content: Some(prompt.user.clone()),
                },
            ],
            temperature: self.config.temperature,
            max_tokens:  self.config.max_tokens,
        }
    }

    /// Shorthand for a connection-kind error.
    fn connection_error(&self, message: impl ToString) -> ProviderError {
        ProviderError::Connection {
            provider: ProviderType::OpenAi,
            message:  message.to_string(),
        }
    }
}

impl AiProvider for OpenAiProvider {
    fn config(&self) -> &AiProviderConfig {
        &self.config
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    fn validate_config(&mut self) -> Result<(), ProviderError> {
        self.config.provider_type = ProviderType::OpenAi;
        apply_defaults(&mut self.config)
    }

    fn complete(&self, prompt: &GradingPrompt) -> Result<String, ProviderError> {
        let url = self.endpoint();
        tracing::debug!(%url, model = %self.config.model, "Sending chat completion request");

        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&self.request(prompt))
            .send()
            .map_err(|e| self.connection_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.connection_error(e))?;

        if !status.is_success() {
            let message = api_error_message(&body).unwrap_or(body);
            return Err(self.connection_error(format!("HTTP {status}: {message}")));
        }

        let envelope: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Provider {
                provider: ProviderType::OpenAi,
                message:  format!("unexpected response body: {e}"),
            })?;

        envelope
            .text()
            .map(str::to_owned)
            .ok_or_else(|| ProviderError::Provider {
                provider: ProviderType::OpenAi,
                message:  "response contained no message content".into(),
            })
    }
}
