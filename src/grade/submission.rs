#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::BTreeMap, path::Path};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{criteria::GradingCriteria, parser::Verdict};
use crate::util::{count_words, read_text_file};

/// A student's response to a discussion question, ready to be graded.
///
/// Deserializing recounts the words rather than trusting a stored count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SubmissionRecord")]
pub struct Submission {
    /// Discussion the submission belongs to.
    discussion_id:   u64,
    /// What the student wrote.
    submission_text: String,
    /// The question being answered.
    question_text:   String,
    /// Whitespace-delimited tokens in `submission_text`, counted once.
    word_count:      usize,
}

impl Submission {
    /// Creates a submission and counts its words.
    pub fn new(
        discussion_id: u64,
        submission_text: impl Into<String>,
        question_text: impl Into<String>,
    ) -> Self {
        let submission_text = submission_text.into();
        let word_count = count_words(&submission_text);
        Self {
            discussion_id,
            submission_text,
            question_text: question_text.into(),
            word_count,
        }
    }

    /// Reads the submission text from `path` (UTF-8, falling back to latin-1).
    pub fn from_file(
        discussion_id: u64,
        path: impl AsRef<Path>,
        question_text: impl Into<String>,
    ) -> Result<Self> {
        let text = read_text_file(path)?;
        Ok(Self::new(discussion_id, text, question_text))
    }

    /// Discussion the submission belongs to.
    pub fn discussion_id(&self) -> u64 {
        self.discussion_id
    }

    /// What the student wrote.
    pub fn submission_text(&self) -> &str {
        &self.submission_text
    }

    /// The question being answered.
    pub fn question_text(&self) -> &str {
        &self.question_text
    }

    /// Number of words in the submission.
    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

/// A submission as stored; any `word_count` is ignored.
#[derive(Deserialize)]
struct SubmissionRecord {
    /// Discussion the submission belongs to.
    #[serde(default)]
    discussion_id:   u64,
    /// What the student wrote.
    submission_text: String,
    /// The question being answered.
    #[serde(default)]
    question_text:   String,
}

impl From<SubmissionRecord> for Submission {
    fn from(record: SubmissionRecord) -> Self {
        Self::new(
            record.discussion_id,
            record.submission_text,
            record.question_text,
        )
    }
}

/// The outcome of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSubmission {
    /// Points awarded. Whole numbers are requested, but older results may
    /// carry fractions.
    score:                   f64,
    /// Feedback addressed to the student.
    feedback:                String,
    /// Concrete ways to improve.
    improvement_suggestions: Vec<String>,
    /// Which rubric sub-questions were addressed.
    addressed_questions:     BTreeMap<String, bool>,
    /// Word count of the graded submission.
    word_count:              usize,
    /// Whether `word_count` met the rubric minimum at grading time.
    meets_word_count:        bool,
    /// Identifier assigned by whoever stores the result.
    submission_id:           Option<u64>,
    /// When the grade was produced.
    created_at:              DateTime<Utc>,
}

impl GradedSubmission {
    /// Combines what the model said with what is known locally.
    ///
    /// The word count comes from the submission and `meets_word_count` is
    /// computed against the rubric; anything the model claimed about either is
    /// ignored. Addressed questions are limited to the rubric's keys.
    pub fn new(verdict: Verdict, submission: &Submission, criteria: &GradingCriteria) -> Self {
        let addressed_questions = verdict
            .addressed_questions
            .into_iter()
            .filter(|(key, _)| criteria.question_keys().contains_key(key))
            .collect();

        Self {
            score: verdict.score,
            feedback: verdict.feedback,
            improvement_suggestions: verdict.improvement_suggestions,
            addressed_questions,
            word_count: submission.word_count(),
            meets_word_count: criteria.meets_word_count(submission.word_count()),
            submission_id: None,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy tagged with the identifier a store assigned to it.
    pub fn with_submission_id(mut self, submission_id: u64) -> Self {
        self.submission_id = Some(submission_id);
        self
    }

    /// Points awarded.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Feedback addressed to the student.
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Concrete ways to improve.
    pub fn improvement_suggestions(&self) -> &[String] {
        &self.improvement_suggestions
    }

    /// Which rubric sub-questions were addressed.
    pub fn addressed_questions(&self) -> &BTreeMap<String, bool> {
        &self.addressed_questions
    }

    /// Word count of the graded submission.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Whether the minimum word count was met.
    pub fn meets_word_count(&self) -> bool {
        self.meets_word_count
    }

    /// Identifier assigned by a store, if any.
    pub fn submission_id(&self) -> Option<u64> {
        self.submission_id
    }

    /// When the grade was produced.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Renders the plain-text grade report shown to instructors.
    pub fn format_report(&self, total_points: u32) -> String {
        let mut lines = vec![
            format!("GRADE: {}/{}", self.score, total_points),
            String::new(),
            format!("WORD COUNT: {} words", self.word_count),
        ];

        if !self.meets_word_count {
            lines.push("WARNING: Below minimum word count".to_string());
        }

        if !self.addressed_questions.is_empty() {
            lines.push(String::new());
            lines.push("QUESTIONS ADDRESSED:".to_string());
            for (key, addressed) in &self.addressed_questions {
                let mark = if *addressed { "✓" } else { "✗" };
                lines.push(format!("- {}: {}", display_key(key), mark));
            }
        }

        lines.push(String::new());
        lines.push("FEEDBACK:".to_string());
        lines.push(self.feedback.clone());

        if !self.improvement_suggestions.is_empty() {
            lines.push(String::new());
            lines.push("SUGGESTIONS FOR IMPROVEMENT:".to_string());
            for suggestion in &self.improvement_suggestions {
                lines.push(format!("- {suggestion}"));
            }
        }

        lines.join("\n")
    }
}

/// `word_choice` -> `Word Choice`
fn display_key(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
