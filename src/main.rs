#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # dgrade
//!
//! Command line front end for grading discussion posts with an LLM.
//!
//! API keys are read from `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`, or from a
//! `.env` file in the working directory. `AI_PROVIDER` picks the backend
//! when `--provider` is not given.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dgrade::{
    AiGrader, GraderOptions, GradingCriteria, Submission,
    constants::{
        DEFAULT_CONFIG_PATH, DEFAULT_MIN_WORDS, DEFAULT_TOTAL_POINTS, SYNTHESIS_FILE_NAME,
    },
    grade::GradingPrompt,
    report::grade_directory,
    util::read_text_file,
};
use dotenvy::dotenv;
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Rubric flags shared by every subcommand.
#[derive(Debug, Clone)]
struct RubricArgs {
    /// Question text given inline.
    question:      Option<String>,
    /// File holding the question text.
    question_file: Option<PathBuf>,
    /// Points available.
    points:        u32,
    /// Minimum word count.
    min_words:     usize,
    /// Criteria replacing the default list.
    criteria:      Vec<String>,
    /// Questions the post must address, as `(key, description)`.
    checks:        Vec<(String, String)>,
}

/// Provider flags for subcommands that talk to a model.
#[derive(Debug, Clone)]
struct ProviderArgs {
    /// `anthropic` or `openai`.
    provider:    Option<String>,
    /// Model identifier.
    model:       Option<String>,
    /// API key.
    api_key:     Option<String>,
    /// Base URL override.
    base_url:    Option<String>,
    /// Sampling temperature.
    temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    max_tokens:  Option<u32>,
    /// JSON config file.
    config:      Option<PathBuf>,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade one submission file
    Grade {
        /// Print JSON instead of the text report.
        json:     bool,
        /// Rubric.
        rubric:   RubricArgs,
        /// Provider settings.
        provider: ProviderArgs,
        /// Submission file.
        file:     PathBuf,
    },
    /// Grade every submission in a directory
    Batch {
        /// Where to write one JSON result per submission.
        output_dir: Option<PathBuf>,
        /// Also synthesize themes and insights across the graded results.
        synthesize: bool,
        /// Rubric.
        rubric:     RubricArgs,
        /// Provider settings.
        provider:   ProviderArgs,
        /// Directory of submissions.
        dir:        PathBuf,
    },
    /// Print the prompts that would be sent for a submission
    Prompt {
        /// Rubric.
        rubric: RubricArgs,
        /// Submission file.
        file:   PathBuf,
    },
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Cli {
    /// Log at debug level.
    verbose: bool,
    /// What to do.
    cmd:     Cmd,
}

/// Parse the command line arguments and return a `Cli`
fn options() -> Cli {
    /// parses the rubric flags
    fn rubric() -> impl Parser<RubricArgs> {
        let question = long("question")
            .short('q')
            .help("Discussion question text")
            .argument::<String>("TEXT")
            .optional();
        let question_file = long("question-file")
            .help("File containing the discussion question")
            .argument::<PathBuf>("PATH")
            .optional();
        let points = long("points")
            .help("Points available for the discussion")
            .argument::<u32>("N")
            .fallback(DEFAULT_TOTAL_POINTS)
            .display_fallback();
        let min_words = long("min-words")
            .help("Minimum word count")
            .argument::<usize>("N")
            .fallback(DEFAULT_MIN_WORDS)
            .display_fallback();
        let criteria = long("criterion")
            .help("Grading criterion; repeat to replace the default list")
            .argument::<String>("TEXT")
            .many();
        let checks = long("check")
            .help("A question the post must address, e.g. `design=Discusses the design`")
            .argument::<String>("KEY=DESCRIPTION")
            .parse(|check| match check.split_once('=') {
                Some((key, description)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), description.trim().to_string()))
                }
                _ => Err(format!("expected KEY=DESCRIPTION, got `{check}`")),
            })
            .many();

        construct!(RubricArgs {
            question,
            question_file,
            points,
            min_words,
            criteria,
            checks
        })
    }

    /// parses the provider flags
    fn provider() -> impl Parser<ProviderArgs> {
        let provider = long("provider")
            .help("LLM provider: anthropic or openai")
            .argument::<String>("NAME")
            .optional();
        let model = long("model")
            .help("Model identifier")
            .argument::<String>("MODEL")
            .optional();
        let api_key = long("api-key")
            .help("API key (defaults to the provider's environment variable)")
            .argument::<String>("KEY")
            .optional();
        let base_url = long("base-url")
            .help("Base URL for OpenAI-compatible endpoints")
            .argument::<String>("URL")
            .optional();
        let temperature = long("temperature")
            .help("Sampling temperature")
            .argument::<f32>("T")
            .optional();
        let max_tokens = long("max-tokens")
            .help("Maximum tokens to generate")
            .argument::<u32>("N")
            .optional();
        let config = long("config")
            .help("JSON config file")
            .argument::<PathBuf>("PATH")
            .optional();

        construct!(ProviderArgs {
            provider,
            model,
            api_key,
            base_url,
            temperature,
            max_tokens,
            config
        })
    }

    /// parses a submission file name
    fn f() -> impl Parser<PathBuf> {
        positional::<PathBuf>("FILE").help("Submission file")
    }

    let grade = {
        let json = long("json").help("Print the result as JSON").switch();
        let rubric = rubric();
        let provider = provider();
        let file = f();
        construct!(Cmd::Grade {
            json,
            rubric,
            provider,
            file
        })
        .to_options()
        .command("grade")
        .help("Grade a single submission")
    };

    let batch = {
        let output_dir = long("output-dir")
            .help("Write each result as JSON into this directory")
            .argument::<PathBuf>("DIR")
            .optional();
        let synthesize = long("synthesize")
            .help("Summarise themes and insights across the graded submissions")
            .switch();
        let rubric = rubric();
        let provider = provider();
        let dir = positional::<PathBuf>("DIR").help("Directory of .txt/.md submissions");
        construct!(Cmd::Batch {
            output_dir,
            synthesize,
            rubric,
            provider,
            dir
        })
        .to_options()
        .command("batch")
        .help("Grade every submission in a directory")
    };

    let prompt = {
        let rubric = rubric();
        let file = f();
        construct!(Cmd::Prompt { rubric, file })
            .to_options()
            .command("prompt")
            .help("Print the grading prompts without calling a model")
    };

    let verbose = short('v')
        .long("verbose")
        .help("Show debug logs")
        .switch();
    let cmd = construct!([grade, batch, prompt]);

    construct!(Cli { verbose, cmd })
        .to_options()
        .descr("Grade discussion posts with an LLM")
        .run()
}

impl RubricArgs {
    /// The question text, read from a file if one was given.
    fn question_text(&self) -> Result<String> {
        match (&self.question, &self.question_file) {
            (Some(question), _) => Ok(question.clone()),
            (None, Some(path)) => Ok(read_text_file(path)?.trim().to_string()),
            (None, None) => {
                anyhow::bail!("Provide the question with --question or --question-file")
            }
        }
    }

    /// The rubric these flags describe.
    fn criteria(&self) -> GradingCriteria {
        let criteria_list = if self.criteria.is_empty() {
            None
        } else {
            Some(self.criteria.clone())
        };
        let question_keys: BTreeMap<String, String> = self.checks.iter().cloned().collect();

        GradingCriteria::builder()
            .maybe_criteria_list(criteria_list)
            .total_points(self.points)
            .min_words(self.min_words)
            .question_keys(question_keys)
            .build()
    }
}

impl ProviderArgs {
    /// Grader options, probing the default config file when none was named.
    fn grader_options(&self) -> GraderOptions {
        let config_path = self.config.clone().or_else(|| {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            default.is_file().then(|| default.to_path_buf())
        });

        GraderOptions::builder()
            .maybe_provider(self.provider.clone())
            .maybe_api_key(self.api_key.clone())
            .maybe_model(self.model.clone())
            .maybe_base_url(self.base_url.clone())
            .maybe_temperature(self.temperature)
            .maybe_max_tokens(self.max_tokens)
            .maybe_config_path(config_path)
            .build()
    }

    /// A grader for these settings.
    fn grader(&self) -> Result<AiGrader> {
        AiGrader::new(self.grader_options()).context("Could not set up the grader")
    }
}

fn main() -> Result<()> {
    dotenv().ok();

    let cli = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match cli.cmd {
        Cmd::Grade {
            json,
            rubric,
            provider,
            file,
        } => {
            let criteria = rubric.criteria();
            let submission = Submission::from_file(0, &file, rubric.question_text()?)?;
            let grader = provider.grader()?;

            let result = grader.grade_submission(&submission, Some(&criteria))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if !result.meets_word_count() {
                    eprintln!(
                        "{}",
                        format!(
                            "Submission has {} words, below the minimum of {}",
                            result.word_count(),
                            criteria.min_words()
                        )
                        .yellow()
                    );
                }
                println!("{}", result.format_report(criteria.total_points()));
            }
        }
        Cmd::Batch {
            output_dir,
            synthesize,
            rubric,
            provider,
            dir,
        } => {
            let criteria = rubric.criteria();
            let question = rubric.question_text()?;
            let grader = provider.grader()?;

            let report =
                grade_directory(&grader, &dir, &question, &criteria, output_dir.as_deref())?;
            if report.attempted() == 0 {
                eprintln!("{}", format!("No submissions found in {}", dir.display()).yellow());
                return Ok(());
            }

            println!("{}", report.summary_table(criteria.total_points()));
            println!("{}", report.stats());

            let summary = format!(
                "Successfully graded {}/{} submissions",
                report.graded.len(),
                report.attempted()
            );
            if report.failures.is_empty() {
                println!("{}", summary.green());
            } else {
                println!("{}", summary.red());
            }

            if synthesize {
                let synthesis = report.synthesize(&grader, &question, criteria.total_points());
                println!("\n{synthesis}");

                if let Some(out) = output_dir.as_deref() {
                    let target = out.join(SYNTHESIS_FILE_NAME);
                    std::fs::write(&target, serde_json::to_string_pretty(&synthesis)?)
                        .with_context(|| format!("Could not write {}", target.display()))?;
                }
            }
        }
        Cmd::Prompt { rubric, file } => {
            let criteria = rubric.criteria();
            let submission = Submission::from_file(0, &file, rubric.question_text()?)?;
            let prompt = GradingPrompt::build(&submission, &criteria);

            println!("{}\n{}\n", "SYSTEM".bold(), prompt.system);
            println!("{}\n{}", "USER".bold(), prompt.user);
        }
    };

    Ok(())
}
