#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! LLM backends behind a single grading interface.
//!
//! A provider only has to know how to send one system/user prompt pair and
//! hand back the raw text of the reply. Prompt rendering, response parsing
//! and result assembly are shared, so every backend grades identically.

/// Anthropic Messages API
pub mod anthropic;
/// OpenAI-compatible chat completions
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use crate::{
    config::{AiProviderConfig, ProviderType},
    grade::{
        GradedSubmission, GradingCriteria, GradingPrompt, ParseError, Submission, SynthesisReport,
        parse_response,
    },
};

/// Everything that can go wrong inside a provider.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// The configuration cannot be used (missing key, unknown provider).
    #[error("{0}")]
    Config(String),
    /// The request did not get a successful answer: transport failures,
    /// authentication and rate limiting all land here.
    #[error("{} API error: {message}", display_name(.provider))]
    Connection {
        /// Which backend failed.
        provider: ProviderType,
        /// What the transport or the API reported.
        message:  String,
    },
    /// No grade could be recovered from the reply text.
    #[error("Failed to parse {} response: {source}", display_name(.provider))]
    Response {
        /// Which backend replied.
        provider: ProviderType,
        /// Why parsing failed.
        #[source]
        source:   ParseError,
    },
    /// Anything else, such as a reply envelope of an unexpected shape.
    #[error("Error grading submission with {}: {message}", display_name(.provider))]
    Provider {
        /// Which backend was involved.
        provider: ProviderType,
        /// What happened.
        message:  String,
    },
}

/// A backend able to grade submissions.
///
/// Implementors supply transport through [`AiProvider::complete`]; the
/// provided [`AiProvider::grade_submission`] and [`AiProvider::synthesize`]
/// do the rest.
pub trait AiProvider: Send + Sync {
    /// The configuration in effect, with defaults filled in.
    fn config(&self) -> &AiProviderConfig;

    /// Which backend this is.
    fn provider_type(&self) -> ProviderType {
        self.config().provider_type
    }

    /// Checks the configuration, filling in defaults for anything optional.
    fn validate_config(&mut self) -> Result<(), ProviderError>;

    /// Sends one request and returns the raw text of the reply.
    fn complete(&self, prompt: &GradingPrompt) -> Result<String, ProviderError>;

    /// Grades one submission with exactly one request to the backend.
    fn grade_submission(
        &self,
        submission: &Submission,
        criteria: &GradingCriteria,
    ) -> Result<GradedSubmission, ProviderError> {
        let provider = self.provider_type();
        let prompt = GradingPrompt::build(submission, criteria);

        tracing::info!(
            %provider,
            model = %self.config().model,
            words = submission.word_count(),
            "Requesting grade"
        );
        let response_text = self.complete(&prompt)?;

        let parsed = parse_response(&response_text)
            .map_err(|source| ProviderError::Response { provider, source })?;
        tracing::debug!(tier = %parsed.tier(), "Parsed grade");

        Ok(GradedSubmission::new(parsed.verdict(), submission, criteria))
    }

    /// Draws themes and insights out of `results` with one request.
    ///
    /// Never fails: a transport or parse error yields
    /// [`SynthesisReport::fallback`], and no request is made for an empty
    /// slice.
    fn synthesize(
        &self,
        question: &str,
        results: &[GradedSubmission],
        total_points: u32,
    ) -> SynthesisReport {
        if results.is_empty() {
            return SynthesisReport::empty();
        }

        let provider = self.provider_type();
        let prompt = GradingPrompt::synthesis(question, results, total_points);

        tracing::info!(
            %provider,
            model = %self.config().model,
            submissions = results.len(),
            "Requesting synthesis"
        );
        let parsed = self.complete(&prompt).and_then(|response_text| {
            parse_response(&response_text)
                .map_err(|source| ProviderError::Response { provider, source })
        });

        match parsed {
            Ok(parsed) => {
                tracing::debug!(tier = %parsed.tier(), "Parsed synthesis");
                SynthesisReport::from_value(parsed.value())
            }
            Err(err) => {
                tracing::warn!("Synthesis failed, using fallback: {err}");
                SynthesisReport::fallback(results, err)
            }
        }
    }
}

/// Fails unless an API key is present, and fills in the provider's default
/// model and base URL where they are unset.
pub(crate) fn apply_defaults(config: &mut AiProviderConfig) -> Result<(), ProviderError> {
    let provider = config.provider_type;

    if config.api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
        return Err(ProviderError::Config(format!(
            "{} API key is required. Set the {} environment variable.",
            display_name(&provider),
            provider.api_key_var()
        )));
    }

    if config.model.trim().is_empty() {
        config.model = provider.default_model().to_string();
    }

    if config.base_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
        config.base_url = provider.default_base_url().map(str::to_string);
    }

    Ok(())
}

/// Pulls `error.message` out of an API error body, as both Anthropic and
/// OpenAI-style endpoints report it.
pub(crate) fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|error| error.get("message").or(Some(error)))
        .map(|message| match message {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

/// Human-facing provider name used in messages.
pub fn display_name(provider: &ProviderType) -> &'static str {
    match provider {
        ProviderType::Anthropic => "Anthropic",
        ProviderType::OpenAi => "OpenAI",
    }
}

/// Builds and validates the provider selected by `provider_type`.
pub fn create_provider(
    provider_type: ProviderType,
    config: AiProviderConfig,
) -> Result<Box<dyn AiProvider>, ProviderError> {
    let config = AiProviderConfig {
        provider_type,
        ..config
    };

    let provider: Box<dyn AiProvider> = match provider_type {
        ProviderType::Anthropic => Box::new(AnthropicProvider::new(config)?),
        ProviderType::OpenAi => Box::new(OpenAiProvider::new(config)?),
    };

    Ok(provider)
}

/// Like [`create_provider`], but takes the provider name as text and rejects
/// names it does not know.
pub fn create_provider_by_name(
    name: &str,
    config: AiProviderConfig,
) -> Result<Box<dyn AiProvider>, ProviderError> {
    let provider_type = name
        .parse::<ProviderType>()
        .map_err(|e| ProviderError::Config(e.to_string()))?;
    create_provider(provider_type, config)
}
