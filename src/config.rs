#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Provider configuration and how it is resolved.
//!
//! Every setting is taken from the first source that has it, in this order:
//! explicit options, the JSON config file, the environment, and finally the
//! provider defaults. The environment is read once into an [`Environment`]
//! value, so nothing below the binary touches process-wide state.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::constants::{
    AI_PROVIDER_VAR, ANTHROPIC_API_KEY_VAR, ANTHROPIC_DEFAULT_MODEL, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, OPENAI_API_KEY_VAR, OPENAI_BASE_URL_VAR, OPENAI_DEFAULT_BASE_URL,
    OPENAI_DEFAULT_MODEL,
};

/// The LLM backends that can grade submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProviderType {
    /// Anthropic's Messages API.
    #[default]
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Any endpoint speaking OpenAI's chat-completions protocol.
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderType {
    /// Lower-case name used in config files and the environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAi => "openai",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => ANTHROPIC_DEFAULT_MODEL,
            ProviderType::OpenAi => OPENAI_DEFAULT_MODEL,
        }
    }

    /// Base URL filled in when none is configured, if the provider takes one.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderType::Anthropic => None,
            ProviderType::OpenAi => Some(OPENAI_DEFAULT_BASE_URL),
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => ANTHROPIC_API_KEY_VAR,
            ProviderType::OpenAi => OPENAI_API_KEY_VAR,
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderType::Anthropic),
            "openai" => Ok(ProviderType::OpenAi),
            _ => Err(ConfigError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Problems found while assembling a provider configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The provider name is not one we know.
    #[error("Unsupported provider type: {0}")]
    UnsupportedProvider(String),
    /// The config file could not be read or parsed.
    #[error("Could not load config file {path}: {reason}")]
    ConfigFile {
        /// Location of the file.
        path:   PathBuf,
        /// What went wrong.
        reason: String,
    },
}

/// Everything a provider needs to make requests.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct AiProviderConfig {
    /// Which backend to talk to.
    pub provider_type: ProviderType,
    /// Model identifier; the provider default is used when empty.
    #[builder(default, into)]
    pub model:         String,
    /// API key for the backend.
    #[builder(into)]
    #[serde(skip_serializing)]
    pub api_key:       Option<String>,
    /// Base URL override, mainly for OpenAI-compatible endpoints.
    #[builder(into)]
    pub base_url:      Option<String>,
    /// Sampling temperature.
    #[builder(default = DEFAULT_TEMPERATURE)]
    pub temperature:   f32,
    /// Maximum number of tokens to generate.
    #[builder(default = DEFAULT_MAX_TOKENS)]
    pub max_tokens:    u32,
}

/// On-disk configuration, shaped
/// `{"ai": {"provider": ..., "anthropic": {...}, "openai": {...}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// The AI section; everything else in the file is ignored.
    #[serde(default)]
    pub ai: AiSection,
}

/// The `ai` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiSection {
    /// Preferred provider name.
    #[serde(default)]
    pub provider:  Option<String>,
    /// Settings for Anthropic.
    #[serde(default)]
    pub anthropic: Option<ProviderSection>,
    /// Settings for OpenAI-compatible endpoints.
    #[serde(default)]
    pub openai:    Option<ProviderSection>,
}

/// Per-provider settings in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSection {
    /// Model identifier.
    #[serde(default)]
    pub model:       Option<String>,
    /// Base URL override.
    #[serde(default)]
    pub base_url:    Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    #[serde(default)]
    pub max_tokens:  Option<u32>,
    /// API key. Prefer the environment for this.
    #[serde(default)]
    pub api_key:     Option<String>,
}

impl ConfigFile {
    /// Reads and parses the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path:   path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::ConfigFile {
            path:   path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// The settings for `provider`, if the file has any.
    pub fn section(&self, provider: ProviderType) -> Option<&ProviderSection> {
        match provider {
            ProviderType::Anthropic => self.ai.anthropic.as_ref(),
            ProviderType::OpenAi => self.ai.openai.as_ref(),
        }
    }
}

/// The environment variables grading cares about, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// `AI_PROVIDER`
    pub ai_provider:       Option<String>,
    /// `ANTHROPIC_API_KEY`
    pub anthropic_api_key: Option<String>,
    /// `OPENAI_API_KEY`
    pub openai_api_key:    Option<String>,
    /// `OPENAI_BASE_URL`
    pub openai_base_url:   Option<String>,
}

impl Environment {
    /// Snapshot of the current process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a snapshot from an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        Self {
            ai_provider:       get(AI_PROVIDER_VAR),
            anthropic_api_key: get(ANTHROPIC_API_KEY_VAR),
            openai_api_key:    get(OPENAI_API_KEY_VAR),
            openai_base_url:   get(OPENAI_BASE_URL_VAR),
        }
    }

    /// The API key for `provider`, if set.
    pub fn api_key(&self, provider: ProviderType) -> Option<&str> {
        match provider {
            ProviderType::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderType::OpenAi => self.openai_api_key.as_deref(),
        }
    }
}

/// Settings given explicitly by the caller. These win over everything else.
#[derive(Debug, Clone, Default, Builder)]
pub struct GraderOptions {
    /// Provider name (`anthropic` or `openai`).
    #[builder(into)]
    pub provider:    Option<String>,
    /// API key.
    #[builder(into)]
    pub api_key:     Option<String>,
    /// Model identifier.
    #[builder(into)]
    pub model:       Option<String>,
    /// Base URL override.
    #[builder(into)]
    pub base_url:    Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    pub max_tokens:  Option<u32>,
    /// JSON config file to read.
    #[builder(into)]
    pub config_path: Option<PathBuf>,
}

/// Merges explicit options, the config file and the environment into one
/// provider configuration.
///
/// Missing models and base URLs are left empty here; the provider fills in
/// its own defaults when it validates the result.
pub fn resolve(
    options: &GraderOptions,
    file: &ConfigFile,
    env: &Environment,
) -> Result<AiProviderConfig, ConfigError> {
    let provider_type = match options
        .provider
        .as_deref()
        .or(file.ai.provider.as_deref())
        .or(env.ai_provider.as_deref())
    {
        Some(name) => name.parse()?,
        None => ProviderType::default(),
    };

    let section = file.section(provider_type).cloned().unwrap_or_default();

    let api_key = options
        .api_key
        .clone()
        .or(section.api_key)
        .or_else(|| env.api_key(provider_type).map(str::to_owned));

    let env_base_url = match provider_type {
        ProviderType::OpenAi => env.openai_base_url.clone(),
        ProviderType::Anthropic => None,
    };
    let base_url = options
        .base_url
        .clone()
        .or(section.base_url)
        .or(env_base_url);

    let model = options
        .model
        .clone()
        .or(section.model)
        .unwrap_or_default();

    let config = AiProviderConfig {
        provider_type,
        model,
        api_key,
        base_url,
        temperature: options
            .temperature
            .or(section.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE),
        max_tokens: options
            .max_tokens
            .or(section.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS),
    };

    tracing::debug!(
        provider = %config.provider_type,
        model = %config.model,
        has_key = config.api_key.is_some(),
        "Resolved provider configuration"
    );

    Ok(config)
}
