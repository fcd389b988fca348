#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Everything about a single grading: the rubric, the submission, the
//! prompt built from them, and the grade recovered from the reply. Also the
//! synthesis drawn from many graded submissions.

/// Rubric and discussion records
pub mod criteria;
/// Recovering structured grades from model output
pub mod parser;
/// Prompt rendering
pub mod prompt;
/// Submissions and their graded results
pub mod submission;
/// Synthesis across graded submissions
pub mod synthesis;

pub use criteria::{Discussion, GradingCriteria};
pub use parser::{ParseError, ParseTier, ParsedResponse, Verdict, parse_response};
pub use prompt::GradingPrompt;
pub use submission::{GradedSubmission, Submission};
pub use synthesis::SynthesisReport;
