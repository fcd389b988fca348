#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The entry point for grading.
//!
//! An [`AiGrader`] resolves its configuration once, builds exactly one
//! provider, and keeps it for its whole lifetime.

use crate::{
    config::{
        AiProviderConfig, ConfigError, ConfigFile, Environment, GraderOptions, ProviderType,
        resolve,
    },
    grade::{GradedSubmission, GradingCriteria, Submission, SynthesisReport},
    providers::{AiProvider, ProviderError, create_provider},
};

/// Errors surfaced to callers of [`AiGrader`].
#[derive(thiserror::Error, Debug)]
pub enum GraderError {
    /// No usable configuration: missing API key, unknown provider, or an
    /// unreadable config file. Raised while constructing the grader.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The request failed in transport, authentication or rate limiting.
    #[error("{0}")]
    Connection(#[source] ProviderError),
    /// The reply held no recoverable grade.
    #[error("{0}")]
    Response(#[source] ProviderError),
    /// Any other provider failure.
    #[error("{0}")]
    Provider(#[source] ProviderError),
}

impl From<ProviderError> for GraderError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Config(message) => GraderError::Configuration(message),
            err @ ProviderError::Connection { .. } => GraderError::Connection(err),
            err @ ProviderError::Response { .. } => GraderError::Response(err),
            err @ ProviderError::Provider { .. } => GraderError::Provider(err),
        }
    }
}

impl From<ConfigError> for GraderError {
    fn from(err: ConfigError) -> Self {
        GraderError::Configuration(err.to_string())
    }
}

/// Grades submissions with whichever provider the configuration selects.
pub struct AiGrader {
    /// The provider chosen at construction.
    provider: Box<dyn AiProvider>,
}

impl AiGrader {
    /// Builds a grader from explicit options and the process environment.
    pub fn new(options: GraderOptions) -> Result<Self, GraderError> {
        Self::with_environment(options, &Environment::from_process())
    }

    /// Builds a grader from explicit options and a captured environment,
    /// loading the config file named in `options`, if any.
    pub fn with_environment(
        options: GraderOptions,
        env: &Environment,
    ) -> Result<Self, GraderError> {
        let file = match options.config_path.as_deref() {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::from_sources(&options, &file, env)
    }

    /// Builds a grader from already-loaded configuration sources.
    pub fn from_sources(
        options: &GraderOptions,
        file: &ConfigFile,
        env: &Environment,
    ) -> Result<Self, GraderError> {
        let config = resolve(options, file, env)?;
        let provider = create_provider(config.provider_type, config)?;

        tracing::info!(
            provider = %provider.provider_type(),
            model = %provider.config().model,
            "Grader ready"
        );

        Ok(Self { provider })
    }

    /// Wraps a provider that was built elsewhere.
    pub fn from_provider(provider: Box<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// The backend in use.
    pub fn provider_type(&self) -> ProviderType {
        self.provider.provider_type()
    }

    /// The provider configuration in use, defaults included.
    pub fn config(&self) -> &AiProviderConfig {
        self.provider.config()
    }

    /// Grades `submission`, against the default rubric when `criteria` is
    /// `None`.
    pub fn grade_submission(
        &self,
        submission: &Submission,
        criteria: Option<&GradingCriteria>,
    ) -> Result<GradedSubmission, GraderError> {
        let default_criteria;
        let criteria = match criteria {
            Some(criteria) => criteria,
            None => {
                default_criteria = GradingCriteria::default();
                &default_criteria
            }
        };

        Ok(self.provider.grade_submission(submission, criteria)?)
    }

    /// Summarises themes and insights across `results`, all graded out of
    /// `total_points`. Failures come back as a fallback report, never as an
    /// error.
    pub fn synthesize(
        &self,
        question_text: &str,
        results: &[GradedSubmission],
        total_points: u32,
    ) -> SynthesisReport {
        self.provider.synthesize(question_text, results, total_points)
    }
}

impl std::fmt::Debug for AiGrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGrader")
            .field("provider", &self.provider.provider_type())
            .field("model", &self.provider.config().model)
            .finish()
    }
}
