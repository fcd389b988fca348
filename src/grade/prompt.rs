#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Renders the system/user prompt pair sent to the model.
//!
//! Rendering is a pure function of the submission and rubric, so the same
//! inputs always produce byte-identical prompts.

use itertools::Itertools;
use serde::Serialize;

use super::{criteria::GradingCriteria, submission::Submission};
use crate::constants::SOFTWARE_ENGINEERING_KEYWORDS;

/// Instructor persona shared by every grading request.
const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

/// Extra instruction for questions about software engineering.
const SOFTWARE_ENGINEERING_EMPHASIS: &str = include_str!("prompts/software_engineering.md");

/// The two messages of a single-turn grading request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradingPrompt {
    /// Instructor persona and tone directives.
    pub system: String,
    /// Question, submission, rubric and the required JSON shape.
    pub user:   String,
}

impl GradingPrompt {
    /// Renders the prompts for grading `submission` against `criteria`.
    pub fn build(submission: &Submission, criteria: &GradingCriteria) -> Self {
        let criteria_lines = criteria
            .criteria_list()
            .iter()
            .map(|criterion| format!("- {criterion}"))
            .join("\n");

        let emphasis = if is_software_engineering(submission.question_text()) {
            format!("\n{SOFTWARE_ENGINEERING_EMPHASIS}\n")
        } else {
            String::new()
        };

        let user = format!(
            include_str!("prompts/user.md"),
            question = submission.question_text(),
            submission = submission.submission_text(),
            total_points = criteria.total_points(),
            criteria = criteria_lines,
            min_words = criteria.min_words(),
            word_count = submission.word_count(),
            emphasis = emphasis,
            addressed_questions = addressed_questions_block(criteria),
        );

        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// Whether the question mentions one of the software-engineering phrases.
fn is_software_engineering(question: &str) -> bool {
    let question = question.to_lowercase();
    SOFTWARE_ENGINEERING_KEYWORDS
        .iter()
        .any(|keyword| question.contains(keyword))
}

/// The `"addressed_questions"` part of the example JSON, or nothing when the
/// rubric has no checklist.
fn addressed_questions_block(criteria: &GradingCriteria) -> String {
    if !criteria.check_addressed_questions() || criteria.question_keys().is_empty() {
        return String::new();
    }

    let mut block = String::from("\n    \"addressed_questions\": {\n");
    for (key, description) in criteria.question_keys() {
        block.push_str(&format!("        \"{key}\": true/false, // {description}\n"));
    }
    block.push_str("    },");
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_ignores_case() {
        assert!(is_software_engineering("Discuss Software Engineering ethics"));
        assert!(is_software_engineering("Which programming paradigm do you prefer?"));
        assert!(!is_software_engineering("What is a binary tree?"));
    }

    #[test]
    fn no_checklist_means_no_block() {
        assert!(addressed_questions_block(&GradingCriteria::default()).is_empty());
    }
}
