#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grading a folder of submissions in one go, and summarising the outcome.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, Width, object::Columns},
};

use crate::{
    constants::SUBMISSION_EXTENSIONS,
    grade::{GradedSubmission, GradingCriteria, Submission, SynthesisReport},
    grader::AiGrader,
    util::submission_files,
};

/// Aggregate numbers over a set of graded submissions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ReportStats {
    /// How many submissions were graded.
    pub total_submissions: usize,
    /// Mean score.
    pub avg_score:         f64,
    /// Lowest score.
    pub min_score:         f64,
    /// Highest score.
    pub max_score:         f64,
    /// Mean word count.
    pub avg_word_count:    f64,
}

impl ReportStats {
    /// Computes statistics over `results`; all zeros when it is empty.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a GradedSubmission>) -> Self {
        let mut stats = Self {
            min_score: f64::INFINITY,
            max_score: f64::NEG_INFINITY,
            ..Self::default()
        };
        let mut score_sum = 0.0;
        let mut word_sum = 0usize;

        for result in results {
            stats.total_submissions += 1;
            score_sum += result.score();
            word_sum += result.word_count();
            stats.min_score = stats.min_score.min(result.score());
            stats.max_score = stats.max_score.max(result.score());
        }

        if stats.total_submissions == 0 {
            return Self::default();
        }

        let n = stats.total_submissions as f64;
        stats.avg_score = score_sum / n;
        stats.avg_word_count = word_sum as f64 / n;
        stats
    }
}

impl std::fmt::Display for ReportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Submissions: {} | Average: {:.2} | Min: {} | Max: {} | Average words: {:.0}",
            self.total_submissions,
            self.avg_score,
            self.min_score,
            self.max_score,
            self.avg_word_count
        )
    }
}

/// One row of the batch summary table.
#[derive(Tabled)]
struct SummaryRow {
    /// File name of the submission.
    #[tabled(rename = "Submission")]
    name:   String,
    /// Score out of the rubric total.
    #[tabled(rename = "Grade")]
    grade:  String,
    /// Word count.
    #[tabled(rename = "Words")]
    words:  usize,
    /// Word-count check, or the failure reason.
    #[tabled(rename = "Status")]
    status: String,
}

/// Outcome of grading every submission in a directory.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successfully graded files, in path order.
    pub graded:   Vec<(PathBuf, GradedSubmission)>,
    /// Files that could not be graded, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchReport {
    /// Number of files attempted.
    pub fn attempted(&self) -> usize {
        self.graded.len() + self.failures.len()
    }

    /// Statistics over the successfully graded files.
    pub fn stats(&self) -> ReportStats {
        ReportStats::from_results(self.graded.iter().map(|(_, result)| result))
    }

    /// Synthesizes themes and insights across the successfully graded files.
    pub fn synthesize(
        &self,
        grader: &AiGrader,
        question_text: &str,
        total_points: u32,
    ) -> SynthesisReport {
        let results: Vec<GradedSubmission> =
            self.graded.iter().map(|(_, result)| result.clone()).collect();
        grader.synthesize(question_text, &results, total_points)
    }

    /// Renders a table with one row per attempted file.
    pub fn summary_table(&self, total_points: u32) -> String {
        let graded = self.graded.iter().map(|(path, result)| SummaryRow {
            name:   file_name(path),
            grade:  format!("{}/{}", result.score(), total_points),
            words:  result.word_count(),
            status: if result.meets_word_count() {
                "ok".to_string()
            } else {
                "below minimum words".to_string()
            },
        });
        let failed = self.failures.iter().map(|(path, reason)| SummaryRow {
            name:   file_name(path),
            grade:  "-".to_string(),
            words:  0,
            status: format!("failed: {reason}"),
        });

        Table::new(graded.chain(failed))
            .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
            .with(Modify::new(Columns::last()).with(Width::wrap(48).keep_words(true)))
            .with(Style::modern())
            .to_string()
    }
}

/// Last path component as text.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Grades every `.txt` and `.md` file directly inside `dir` against one
/// rubric.
///
/// A file that fails to read or grade is recorded in
/// [`BatchReport::failures`] and the rest are still graded. When
/// `output_dir` is given, each result is also written there as
/// `<file name>.json`, so `post.md` and `post.txt` keep separate results.
pub fn grade_directory(
    grader: &AiGrader,
    dir: &Path,
    question_text: &str,
    criteria: &GradingCriteria,
    output_dir: Option<&Path>,
) -> Result<BatchReport> {
    let files = submission_files(dir, &SUBMISSION_EXTENSIONS)?;
    tracing::info!("Found {} submissions in {}", files.len(), dir.display());

    if let Some(out) = output_dir {
        std::fs::create_dir_all(out)
            .with_context(|| format!("Could not create output directory {}", out.display()))?;
    }

    let mut report = BatchReport::default();
    for path in files {
        match grade_file(grader, &path, question_text, criteria, output_dir) {
            Ok(result) => {
                tracing::info!(
                    "Graded {}: {}/{}",
                    path.display(),
                    result.score(),
                    criteria.total_points()
                );
                report.graded.push((path, result));
            }
            Err(err) => {
                tracing::error!("Error grading {}: {err:#}", path.display());
                report.failures.push((path, format!("{err:#}")));
            }
        }
    }

    Ok(report)
}

/// Grades a single file and writes its JSON result if asked to.
fn grade_file(
    grader: &AiGrader,
    path: &Path,
    question_text: &str,
    criteria: &GradingCriteria,
    output_dir: Option<&Path>,
) -> Result<GradedSubmission> {
    let submission = Submission::from_file(0, path, question_text)?;
    let result = grader.grade_submission(&submission, Some(criteria))?;

    if let Some(out) = output_dir {
        let target = out.join(format!("{}.json", file_name(path)));
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&target, json)
            .with_context(|| format!("Could not write {}", target.display()))?;
    }

    Ok(result)
}
