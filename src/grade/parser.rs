#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Recovers a structured grade from whatever text the model sent back.
//!
//! Models do not reliably return clean JSON, so parsing escalates through
//! three tiers, each tried only when the previous one failed:
//!
//! 1. slice from the first `{` to the last `}` and parse it as JSON;
//! 2. escape raw control characters inside string literals and parse again;
//! 3. pull the known fields out one by one with regular expressions.
//!
//! Text without a `{ ... }` span is rejected outright.

use std::{collections::BTreeMap, fmt};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::constants::{EXTRACTION_FAILED_FEEDBACK, MISSING_FEEDBACK};

/// Number of characters of the raw response quoted in error messages.
const CONTEXT_CHARS: usize = 200;

/// Which parsing tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseTier {
    /// The bracketed span was valid JSON as-is.
    Direct,
    /// Valid JSON after escaping raw control characters.
    Sanitized,
    /// Fields recovered with regular expressions.
    Extracted,
}

impl fmt::Display for ParseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseTier::Direct => "direct",
            ParseTier::Sanitized => "sanitized",
            ParseTier::Extracted => "regex",
        };
        write!(f, "{name}")
    }
}

/// Ways parsing a model response can fail outright.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// There was no `{ ... }` span in the response.
    #[error("Could not find valid JSON in the AI response: {context:?}")]
    NoJsonObject {
        /// The start of the offending response.
        context: String,
    },
    /// The regex tier itself failed.
    #[error("Failed to extract fields with regex: {reason}")]
    Extraction {
        /// What went wrong.
        reason: String,
    },
}

/// A model response turned into JSON, along with the tier that managed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// The recovered object.
    value: Value,
    /// How it was recovered.
    tier:  ParseTier,
}

impl ParsedResponse {
    /// The recovered JSON value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The tier that produced the value.
    pub fn tier(&self) -> ParseTier {
        self.tier
    }

    /// Reads the grading fields out of the value.
    pub fn verdict(&self) -> Verdict {
        Verdict::from_value(&self.value)
    }
}

/// The grading fields the model is asked for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Verdict {
    /// Points awarded.
    pub score:                   f64,
    /// Feedback addressed to the student.
    pub feedback:                String,
    /// Concrete ways to improve.
    pub improvement_suggestions: Vec<String>,
    /// Which sub-questions were addressed.
    pub addressed_questions:     BTreeMap<String, bool>,
}

impl Verdict {
    /// Reads the grading fields from a JSON value, substituting defaults for
    /// anything missing or of the wrong shape.
    pub fn from_value(value: &Value) -> Self {
        let score = match value.get("score") {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        };

        let feedback = match value.get("feedback") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => MISSING_FEEDBACK.to_string(),
            Some(other) => other.to_string(),
        };

        let improvement_suggestions = match value.get("improvement_suggestions") {
            Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        };

        let addressed_questions = match value.get("addressed_questions") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(key, flag)| {
                    let flag = match flag {
                        Value::Bool(b) => *b,
                        Value::String(s) if s.eq_ignore_ascii_case("true") => true,
                        Value::String(s) if s.eq_ignore_ascii_case("false") => false,
                        _ => return None,
                    };
                    Some((key.clone(), flag))
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            score,
            feedback,
            improvement_suggestions,
            addressed_questions,
        }
    }
}

/// Strings stay as they are; anything else is rendered as JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses a raw model response.
///
/// Only a response with no `{ ... }` span, or a failure inside the regex tier
/// itself, is an error. Everything else yields a value, with missing fields
/// left for [`Verdict::from_value`] to default.
pub fn parse_response(response_text: &str) -> Result<ParsedResponse, ParseError> {
    let json_str = bracketed_span(response_text).ok_or_else(|| ParseError::NoJsonObject {
        context: snippet(response_text),
    })?;

    match serde_json::from_str::<Value>(json_str) {
        Ok(value) => {
            tracing::debug!("Parsed model response as JSON");
            return Ok(ParsedResponse {
                value,
                tier: ParseTier::Direct,
            });
        }
        Err(err) => tracing::debug!("Model response is not valid JSON ({err}), sanitizing"),
    }

    let sanitized = escape_control_characters(json_str);
    match serde_json::from_str::<Value>(&sanitized) {
        Ok(value) => {
            tracing::debug!("Parsed model response after escaping control characters");
            return Ok(ParsedResponse {
                value,
                tier: ParseTier::Sanitized,
            });
        }
        Err(err) => {
            tracing::warn!("Model response is still not valid JSON ({err}), extracting fields")
        }
    }

    let value = extract_fields(json_str)?;
    Ok(ParsedResponse {
        value,
        tier: ParseTier::Extracted,
    })
}

/// The text from the first `{` to the last `}`, if the latter follows the
/// former.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// The first few characters of `text`, for error messages.
fn snippet(text: &str) -> String {
    let mut snippet: String = text.chars().take(CONTEXT_CHARS).collect();
    if text.chars().count() > CONTEXT_CHARS {
        snippet.push_str("...");
    }
    snippet
}

/// Rewrites raw control characters (U+0000 to U+001F) inside JSON string
/// literals as `\u00XX` escapes. Whitespace between tokens is left alone so
/// pretty-printed objects stay valid.
fn escape_control_characters(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in json.chars() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_string = false;
                out.push(ch);
            }
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out
}

/// Compiles one of the extraction patterns.
fn pattern(source: &str) -> Result<Regex, ParseError> {
    Regex::new(source).map_err(|e| ParseError::Extraction {
        reason: e.to_string(),
    })
}

/// Decodes JSON escapes in a captured string body, keeping the raw text when
/// it is not a valid JSON string.
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

/// Last-resort recovery of the grading fields from malformed JSON.
///
/// Never fails for a missing field: score defaults to 0, feedback to a
/// placeholder, and the collections to empty.
fn extract_fields(json_str: &str) -> Result<Value, ParseError> {
    let score_re = pattern(r#""score"\s*:\s*"?(\d+(?:\.\d+)?)"#)?;
    // Runs lazily up to a quote that is followed by the next key or the end
    // of the object, so unescaped quotes inside the feedback survive.
    let feedback_re = pattern(r#"(?s)"feedback"\s*:\s*"(.*?)"\s*(?:,\s*"|\}|$)"#)?;
    let suggestions_re = pattern(r#"(?s)"improvement_suggestions"\s*:\s*\[(.*?)\]"#)?;
    let item_re = pattern(r#"(?s)"((?:[^"\\]|\\.)*)""#)?;
    let pair_re = pattern(r#""([^"]+)"\s*:\s*(true|false)"#)?;

    let score = match score_re.captures(json_str) {
        Some(caps) => caps[1].parse::<f64>().map_err(|e| ParseError::Extraction {
            reason: format!("score {:?} is not a number: {e}", &caps[1]),
        })?,
        None => 0.0,
    };

    let feedback = feedback_re
        .captures(json_str)
        .map(|caps| unescape(&caps[1]))
        .unwrap_or_else(|| EXTRACTION_FAILED_FEEDBACK.to_string());

    let suggestions: Vec<Value> = suggestions_re
        .captures(json_str)
        .map(|caps| {
            item_re
                .captures_iter(&caps[1])
                .map(|item| Value::String(unescape(&item[1])))
                .collect()
        })
        .unwrap_or_default();

    let mut addressed = Map::new();
    for segment in json_str.split("\"addressed_questions\"").skip(1) {
        for caps in pair_re.captures_iter(segment) {
            addressed.insert(caps[1].to_string(), Value::Bool(&caps[2] == "true"));
        }
    }

    tracing::debug!(
        score,
        suggestions = suggestions.len(),
        addressed = addressed.len(),
        "Recovered fields with regex"
    );

    Ok(json!({
        "score": score,
        "feedback": feedback,
        "improvement_suggestions": suggestions,
        "addressed_questions": addressed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_needs_closing_after_opening_brace() {
        assert_eq!(bracketed_span("x {\"a\": 1} y"), Some("{\"a\": 1}"));
        assert_eq!(bracketed_span("} before {"), None);
        assert_eq!(bracketed_span("no braces"), None);
    }

    #[test]
    fn control_characters_escaped_only_inside_strings() {
        let raw = "{\n  \"feedback\": \"line one\nline two\\\"\tquoted\"\n}";
        let escaped = escape_control_characters(raw);
        assert_eq!(escaped, "{\n  \"feedback\": \"line one\\u000aline two\\\"\\u0009quoted\"\n}");
    }

    #[test]
    fn feedback_pattern_tolerates_unescaped_quotes() {
        let value = extract_fields(
            r#"{"score": 9, "feedback": "You said "hello" well.", "improvement_suggestions": ["a" "b"]}"#,
        )
        .expect("extract");
        assert_eq!(value["feedback"], "You said \"hello\" well.");
        assert_eq!(value["improvement_suggestions"], json!(["a", "b"]));
    }

    #[test]
    fn snippet_is_truncated() {
        let long = "x".repeat(500);
        let snip = snippet(&long);
        assert!(snip.ends_with("..."));
        assert_eq!(snip.chars().count(), CONTEXT_CHARS + 3);
    }
}
