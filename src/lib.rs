//! # dgrade
//!
//! Grades free-text discussion posts against a rubric with a large language
//! model. A submission and its rubric are rendered into a prompt, sent to
//! Anthropic or an OpenAI-compatible endpoint, and the loosely formatted JSON
//! that comes back is parsed into a structured grade.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Default models, endpoints, environment variable names and rubric text
pub mod constants;
/// Provider configuration and its precedence rules
pub mod config;
/// Rubrics, submissions, prompts and response parsing
pub mod grade;
/// The grading facade
pub mod grader;
/// LLM backends
pub mod providers;
/// Batch grading and summaries
pub mod report;
/// Utility functions for convenience
pub mod util;

pub use config::{AiProviderConfig, Environment, GraderOptions, ProviderType};
pub use grade::{GradedSubmission, GradingCriteria, Submission};
pub use grader::{AiGrader, GraderError};
