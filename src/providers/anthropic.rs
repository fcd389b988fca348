#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{AiProvider, ProviderError, api_error_message, apply_defaults};
use crate::{
    config::{AiProviderConfig, ProviderType},
    constants::{ANTHROPIC_API_VERSION, ANTHROPIC_DEFAULT_BASE_URL},
    grade::GradingPrompt,
};

/// Request body for the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    /// Model identifier.
    pub model:       String,
    /// Maximum number of tokens to generate.
    pub max_tokens:  u32,
    /// System instruction.
    pub system:      String,
    /// Conversation turns; grading sends a single user turn.
    pub messages:    Vec<Message>,
    /// Sampling temperature.
    pub temperature: f32,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `user` or `assistant`.
    pub role:    String,
    /// Message text.
    pub content: String,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    /// Content blocks in the reply.
    pub content: Vec<ContentBlock>,
}

/// A content block in the response.
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    /// Block kind, `text` for plain text.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text of the block, when it is a text block.
    pub text:         Option<String>,
}

impl MessagesResponse {
    /// Extract the text content from the first text block, if any.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.content_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

/// Grades through Anthropic's Messages API.
#[derive(Debug)]
pub struct AnthropicProvider {
    /// Validated configuration.
    config: AiProviderConfig,
    /// Blocking HTTP client with reqwest's default timeout.
    http:   Client,
}

impl AnthropicProvider {
    /// Validates `config` and prepares an HTTP client.
    pub fn new(config: AiProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to construct HTTP client: {e}")))?;

        let mut provider = Self { config, http };
        provider.validate_config()?;
        Ok(provider)
    }

    /// Messages endpoint, honouring a base URL override.
    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(ANTHROPIC_DEFAULT_BASE_URL);
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }

    /// The request body for `prompt`.
    fn request(&self, prompt: &GradingPrompt) -> MessagesRequest {
        MessagesRequest {
            model:       self.config.model.clone(),
            max_tokens:  self.config.max_tokens,
            system:      prompt.system.clone(),
            messages:    vec![Message {
                role:    "user".into(),
                content: prompt.user.clone(),
            }],
            temperature: self.config.temperature,
        }
    }

    /// Shorthand for a connection-kind error.
    fn connection_error(&self, message: impl ToString) -> ProviderError {
        ProviderError::Connection {
            provider: ProviderType::Anthropic,
            message:  message.to_string(),
        }
    }
}

impl AiProvider for AnthropicProvider {
    fn config(&self) -> &AiProviderConfig {
        &self.config
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn validate_config(&mut self) -> Result<(), ProviderError> {
        self.config.provider_type = ProviderType::Anthropic;
        apply_defaults(&mut self.config)
    }

    fn complete(&self, prompt: &GradingPrompt) -> Result<String, ProviderError> {
        let url = self.endpoint();
        tracing::debug!(%url, model = %self.config.model, "Sending Anthropic messages request");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", self.config.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&self.request(prompt))
            .send()
            .map_err(|e| self.connection_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.connection_error(e))?;

        if !status.is_success() {
            let message = api_error_message(&body).unwrap_or(body);
            return Err(self.connection_error(format!("HTTP {status}: {message}")));
        }

        let envelope: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Provider {
                provider: ProviderType::Anthropic,
                message:  format!("unexpected response body: {e}"),
            })?;

        envelope
            .text()
            .map(str::to_owned)
            .ok_or_else(|| ProviderError::Provider {
                provider: ProviderType::Anthropic,
                message:  "response contained no text content".into(),
            })
    }
}
