#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Instructor-facing synthesis over a set of graded submissions.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{prompt::GradingPrompt, submission::GradedSubmission};
use crate::constants::{SYNTHESIS_FAILED_THEME, SYNTHESIS_UNAVAILABLE};

/// Asks for insights, themes and perspectives rather than a grade.
const SYNTHESIS_SYSTEM_PROMPT: &str = include_str!("prompts/synthesis_system.md");

/// Common themes and standout insights drawn from many submissions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// Overview of all responses.
    pub summary:         String,
    /// Ideas that recur across responses.
    pub key_themes:      Vec<String>,
    /// Perspectives only a few responses offered.
    pub unique_insights: Vec<String>,
}

impl SynthesisReport {
    /// Reads a parsed reply, defaulting whatever is missing.
    ///
    /// List entries that are not strings are dropped.
    pub fn from_value(value: &Value) -> Self {
        let list = |key: &str| -> Vec<String> {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            summary:         value
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or(SYNTHESIS_UNAVAILABLE)
                .to_string(),
            key_themes:      list("key_themes"),
            unique_insights: list("unique_insights"),
        }
    }

    /// What is reported when the synthesis request itself failed.
    pub fn fallback(results: &[GradedSubmission], error: impl fmt::Display) -> Self {
        let average = if results.is_empty() {
            0.0
        } else {
            results.iter().map(GradedSubmission::score).sum::<f64>() / results.len() as f64
        };

        Self {
            summary:         format!(
                "Synthesis of {} submissions. Average score: {average:.1}",
                results.len()
            ),
            key_themes:      vec![SYNTHESIS_FAILED_THEME.to_string()],
            unique_insights: vec![format!("AI synthesis failed: {error}")],
        }
    }

    /// The report for an empty batch; nothing is sent to the model.
    pub fn empty() -> Self {
        Self {
            summary: "No graded submissions to synthesize.".to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for SynthesisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SYNTHESIS SUMMARY:\n{}\n", self.summary)?;
        writeln!(f, "KEY THEMES:\n{}\n", numbered(&self.key_themes))?;
        write!(f, "UNIQUE INSIGHTS:\n{}", numbered(&self.unique_insights))
    }
}

/// `  1. first` style lines.
fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("  {}. {item}", i + 1))
        .join("\n")
}

impl GradingPrompt {
    /// Renders the prompts for synthesizing `results`, each shown with its
    /// score out of `total_points`, word count and feedback.
    pub fn synthesis(question: &str, results: &[GradedSubmission], total_points: u32) -> Self {
        let submissions = results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                format!(
                    "Submission {} (Score: {}/{total_points}, {} words):\nFeedback: {}",
                    i + 1,
                    result.score(),
                    result.word_count(),
                    result.feedback()
                )
            })
            .join("\n");

        Self {
            system: SYNTHESIS_SYSTEM_PROMPT.to_string(),
            user:   format!(
                include_str!("prompts/synthesis_user.md"),
                question = question,
                submissions = submissions,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let report = SynthesisReport::from_value(&json!({"key_themes": ["reuse", 3]}));
        assert_eq!(report.summary, SYNTHESIS_UNAVAILABLE);
        assert_eq!(report.key_themes, ["reuse"]);
        assert!(report.unique_insights.is_empty());
    }

    #[test]
    fn empty_lists_render_as_bare_headings() {
        let text = SynthesisReport::empty().to_string();
        assert!(text.starts_with("SYNTHESIS SUMMARY:\nNo graded submissions"));
        assert!(text.contains("KEY THEMES:\n\n"));
        assert!(text.ends_with("UNIQUE INSIGHTS:\n"));
    }
}
