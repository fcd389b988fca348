use dgrade::{
    constants::EXTRACTION_FAILED_FEEDBACK,
    grade::{ParseError, ParseTier, parse_response},
};
use serde_json::json;

#[test]
fn well_formed_object_parses_directly() {
    let object = json!({
        "score": 9,
        "feedback": "Clear and well argued.",
        "improvement_suggestions": ["Add an example", "Cite the reading"],
        "addressed_questions": {"design": true, "testing": false},
        "word_count": 320
    });

    let parsed = parse_response(&object.to_string()).expect("parse");
    assert_eq!(parsed.tier(), ParseTier::Direct);
    assert_eq!(parsed.value(), &object);
}

#[test]
fn fences_and_prose_around_the_object_are_ignored() {
    let object = json!({"score": 11, "feedback": "Great", "improvement_suggestions": []});

    for wrapped in [
        format!("```json\n{object}\n```"),
        format!("Here is my evaluation:\n\n{object}\n\nLet me know if you need more."),
    ] {
        let parsed = parse_response(&wrapped).expect("parse");
        assert_eq!(parsed.tier(), ParseTier::Direct);
        assert_eq!(parsed.value(), &object);
    }
}

#[test]
fn raw_newline_in_feedback_is_sanitized() {
    let response = "{\"score\": 10, \"feedback\": \"Line one\nLine two\", \
                    \"improvement_suggestions\": [\"More detail\"]}";

    let parsed = parse_response(response).expect("parse");
    assert_eq!(parsed.tier(), ParseTier::Sanitized);

    let verdict = parsed.verdict();
    assert_eq!(verdict.score, 10.0);
    assert_eq!(verdict.feedback, "Line one\nLine two");
    assert_eq!(verdict.improvement_suggestions, vec!["More detail"]);
}

#[test]
fn pretty_printed_object_with_raw_tab_is_sanitized() {
    let response = "{\n    \"score\": 6,\n    \"feedback\": \"Tabbed\there\",\n    \
                    \"improvement_suggestions\": []\n}";

    let parsed = parse_response(response).expect("parse");
    assert_eq!(parsed.tier(), ParseTier::Sanitized);
    assert_eq!(parsed.verdict().feedback, "Tabbed\there");
}

#[test]
fn missing_comma_in_array_falls_back_to_extraction() {
    let response = r#"{"score": 8, "feedback": "Good", "improvement_suggestions": ["a" "b"]}"#;

    let parsed = parse_response(response).expect("parse");
    assert_eq!(parsed.tier(), ParseTier::Extracted);

    let verdict = parsed.verdict();
    assert_eq!(verdict.score, 8.0);
    assert_eq!(verdict.feedback, "Good");
    assert!(!verdict.improvement_suggestions.is_empty());
    assert_eq!(verdict.improvement_suggestions, vec!["a", "b"]);
}

#[test]
fn extraction_recovers_addressed_questions() {
    let response = r#"{"score": "7", "feedback": "Fine", "improvement_suggestions": ["x",],
        "addressed_questions": {"design": true, "testing": false,}}"#;

    let parsed = parse_response(response).expect("parse");
    assert_eq!(parsed.tier(), ParseTier::Extracted);

    let verdict = parsed.verdict();
    assert_eq!(verdict.score, 7.0);
    assert_eq!(verdict.addressed_questions.get("design"), Some(&true));
    assert_eq!(verdict.addressed_questions.get("testing"), Some(&false));
}

#[test]
fn response_without_braces_is_an_error() {
    let err = parse_response("I'm sorry, I can't grade this submission.").unwrap_err();
    assert!(matches!(err, ParseError::NoJsonObject { .. }));
    assert!(err.to_string().contains("Could not find valid JSON"));
    assert!(err.to_string().contains("I'm sorry"));
}

#[test]
fn closing_brace_before_opening_brace_is_an_error() {
    let err = parse_response("} nothing here {").unwrap_err();
    assert!(matches!(err, ParseError::NoJsonObject { .. }));
}

#[test]
fn missing_fields_take_defaults() {
    let verdict = parse_response(r#"{"score": 7}"#).expect("parse").verdict();
    assert_eq!(verdict.score, 7.0);
    assert_eq!(verdict.feedback, "No feedback provided");
    assert!(verdict.improvement_suggestions.is_empty());
    assert!(verdict.addressed_questions.is_empty());
}

#[test]
fn malformed_reply_missing_fields_take_extraction_defaults() {
    let parsed = parse_response(r#"{"score": oops, "improvement_suggestions": ["a" "b"]}"#)
        .expect("parse");
    assert_eq!(parsed.tier(), ParseTier::Extracted);

    let verdict = parsed.verdict();
    assert_eq!(verdict.score, 0.0);
    assert_eq!(verdict.feedback, EXTRACTION_FAILED_FEEDBACK);
    assert_eq!(verdict.improvement_suggestions, ["a", "b"]);
    assert!(verdict.addressed_questions.is_empty());
}

#[test]
fn non_numeric_score_defaults_to_zero() {
    let verdict = parse_response(r#"{"score": "high", "feedback": "ok"}"#)
        .expect("parse")
        .verdict();
    assert_eq!(verdict.score, 0.0);
    assert_eq!(verdict.feedback, "ok");
}
