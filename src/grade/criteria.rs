#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CRITERIA, DEFAULT_MIN_WORDS, DEFAULT_TOTAL_POINTS};

/// The slice of a stored discussion that grading needs.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct Discussion {
    /// Identifier of the discussion in whatever store owns it.
    #[builder(default)]
    pub id:               u64,
    /// The question students answered.
    #[builder(default)]
    pub question_content: String,
    /// Points the discussion is worth.
    #[builder(default = DEFAULT_TOTAL_POINTS)]
    pub points:           u32,
    /// Minimum number of words expected in a submission.
    #[builder(default = DEFAULT_MIN_WORDS)]
    pub min_words:        usize,
}

/// The rubric a submission is graded against.
///
/// Built once and never mutated. When `check_addressed_questions` is set,
/// `question_keys` holds at least one entry. Deserializing goes through
/// [`GradingCriteria::new`], so stored rubrics obey the same rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CriteriaRecord")]
pub struct GradingCriteria {
    /// Rubric bullet points, in display order.
    criteria_list:             Vec<String>,
    /// Minimum word count.
    min_words:                 usize,
    /// Points available.
    total_points:              u32,
    /// Whether the model must report which sub-questions were addressed.
    check_addressed_questions: bool,
    /// Sub-question keys mapped to their descriptions.
    question_keys:             BTreeMap<String, String>,
}

#[bon::bon]
impl GradingCriteria {
    /// Builds a rubric. The addressed-questions checklist is switched on
    /// exactly when `question_keys` is non-empty, and `total_points` is
    /// clamped to at least one.
    #[builder]
    pub fn new(
        #[builder(default = default_criteria_list())] criteria_list: Vec<String>,
        #[builder(default = DEFAULT_MIN_WORDS)] min_words: usize,
        #[builder(default = DEFAULT_TOTAL_POINTS)] total_points: u32,
        #[builder(default)] question_keys: BTreeMap<String, String>,
    ) -> Self {
        Self {
            criteria_list,
            min_words,
            total_points: total_points.max(1),
            check_addressed_questions: !question_keys.is_empty(),
            question_keys,
        }
    }

    /// Derives a rubric from a discussion's point total and word minimum.
    ///
    /// * `criteria_list`: rubric bullets, the default list when `None`
    /// * `question_keys`: optional addressed-questions checklist
    pub fn from_discussion(
        discussion: &Discussion,
        criteria_list: Option<Vec<String>>,
        question_keys: Option<BTreeMap<String, String>>,
    ) -> Self {
        Self::builder()
            .criteria_list(criteria_list.unwrap_or_else(default_criteria_list))
            .min_words(discussion.min_words)
            .total_points(discussion.points)
            .question_keys(question_keys.unwrap_or_default())
            .build()
    }

    /// Rubric bullet points, in display order.
    pub fn criteria_list(&self) -> &[String] {
        &self.criteria_list
    }

    /// Minimum word count.
    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Points available.
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    /// Whether the addressed-questions checklist is active.
    pub fn check_addressed_questions(&self) -> bool {
        self.check_addressed_questions
    }

    /// Sub-question keys mapped to their descriptions.
    pub fn question_keys(&self) -> &BTreeMap<String, String> {
        &self.question_keys
    }

    /// Whether `word_count` satisfies the minimum.
    pub fn meets_word_count(&self, word_count: usize) -> bool {
        word_count >= self.min_words
    }
}

/// A rubric as stored. `check_addressed_questions` is not read back; it is
/// derived from `question_keys` again.
#[derive(Deserialize)]
struct CriteriaRecord {
    /// Rubric bullets, the default list when absent.
    #[serde(default)]
    criteria_list: Option<Vec<String>>,
    /// Minimum word count.
    #[serde(default)]
    min_words:     Option<usize>,
    /// Points available.
    #[serde(default)]
    total_points:  Option<u32>,
    /// Addressed-questions checklist.
    #[serde(default)]
    question_keys: BTreeMap<String, String>,
}

impl From<CriteriaRecord> for GradingCriteria {
    fn from(record: CriteriaRecord) -> Self {
        Self::builder()
            .maybe_criteria_list(record.criteria_list)
            .maybe_min_words(record.min_words)
            .maybe_total_points(record.total_points)
            .question_keys(record.question_keys)
            .build()
    }
}

impl Default for GradingCriteria {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The stock rubric bullets as owned strings.
fn default_criteria_list() -> Vec<String> {
    DEFAULT_CRITERIA.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rubric_matches_stock_values() {
        let criteria = GradingCriteria::default();
        assert_eq!(criteria.total_points(), 12);
        assert_eq!(criteria.min_words(), 300);
        assert_eq!(criteria.criteria_list().len(), 4);
        assert!(!criteria.check_addressed_questions());
        assert!(criteria.question_keys().is_empty());
    }

    #[test]
    fn question_keys_switch_on_checklist() {
        let keys = BTreeMap::from([("q1".to_string(), "Defines the term".to_string())]);
        let criteria = GradingCriteria::builder().question_keys(keys).build();
        assert!(criteria.check_addressed_questions());
    }

    #[test]
    fn zero_points_is_clamped() {
        let criteria = GradingCriteria::builder().total_points(0).build();
        assert_eq!(criteria.total_points(), 1);
    }

    #[test]
    fn from_discussion_copies_points_and_minimum() {
        let discussion = Discussion::builder()
            .question_content("What is a design pattern?")
            .points(10)
            .min_words(250)
            .build();
        let criteria = GradingCriteria::from_discussion(&discussion, None, None);
        assert_eq!(criteria.total_points(), 10);
        assert_eq!(criteria.min_words(), 250);
        assert_eq!(criteria.criteria_list()[0], "Understanding of the topic");
        assert!(!criteria.check_addressed_questions());
    }

    #[test]
    fn stored_rubric_is_rebuilt_through_the_constructor() {
        let stored = serde_json::json!({
            "criteria_list": ["Accuracy"],
            "min_words": 150,
            "total_points": 0,
            "check_addressed_questions": true,
            "question_keys": {}
        });
        let criteria: GradingCriteria = serde_json::from_value(stored).expect("deserialize");

        assert_eq!(criteria.criteria_list(), ["Accuracy"]);
        assert_eq!(criteria.min_words(), 150);
        assert_eq!(criteria.total_points(), 1);
        assert!(!criteria.check_addressed_questions());

        let keyed: GradingCriteria = serde_json::from_value(serde_json::json!({
            "check_addressed_questions": false,
            "question_keys": {"q1": "First part"}
        }))
        .expect("deserialize");
        assert!(keyed.check_addressed_questions());
        assert_eq!(keyed.total_points(), DEFAULT_TOTAL_POINTS);
        assert_eq!(keyed.criteria_list().len(), DEFAULT_CRITERIA.len());
    }

    #[test]
    fn serialized_rubric_reads_back_unchanged() {
        let criteria = GradingCriteria::builder()
            .total_points(20)
            .question_keys(BTreeMap::from([("q1".to_string(), "First".to_string())]))
            .build();
        let json = serde_json::to_string(&criteria).expect("serialize");
        let back: GradingCriteria = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, criteria);
    }
}
