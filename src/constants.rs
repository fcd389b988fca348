#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Model used for Anthropic when none is configured
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-opus-20240229";

/// Anthropic API root; the messages endpoint is appended to it
pub const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Value sent in the `anthropic-version` header
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Model used for OpenAI-compatible endpoints when none is configured
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4";

/// Base URL used for OpenAI-compatible endpoints when none is configured
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sampling temperature used unless overridden
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Completion token limit used unless overridden
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Environment variable holding the Anthropic API key
pub const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable selecting the provider (`anthropic` or `openai`)
pub const AI_PROVIDER_VAR: &str = "AI_PROVIDER";

/// Environment variable overriding the OpenAI-compatible base URL
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";

/// Config file probed by the CLI when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Points a discussion is worth unless stated otherwise
pub const DEFAULT_TOTAL_POINTS: u32 = 12;

/// Minimum word count unless stated otherwise
pub const DEFAULT_MIN_WORDS: usize = 300;

/// Rubric used when a discussion does not carry its own criteria
pub const DEFAULT_CRITERIA: [&str; 4] = [
    "Understanding of the topic",
    "Clarity of explanation",
    "Use of specific examples",
    "Depth of analysis",
];

/// Question phrases that trigger the software-engineering emphasis in prompts
pub const SOFTWARE_ENGINEERING_KEYWORDS: [&str; 4] = [
    "software engineering",
    "software development",
    "coding practices",
    "programming paradigm",
];

/// Feedback used when a response is missing one
pub const MISSING_FEEDBACK: &str = "No feedback provided";

/// Feedback placeholder produced when regex extraction cannot find one
pub const EXTRACTION_FAILED_FEEDBACK: &str = "Error extracting feedback";

/// Extensions picked up when batch grading a directory
pub const SUBMISSION_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Synthesis summary used when a response is missing one
pub const SYNTHESIS_UNAVAILABLE: &str = "Synthesis unavailable";

/// Only theme reported when the synthesis request fails
pub const SYNTHESIS_FAILED_THEME: &str = "Theme extraction failed due to API error";

/// File the CLI writes a batch synthesis to inside the output directory
pub const SYNTHESIS_FILE_NAME: &str = "synthesis.json";
