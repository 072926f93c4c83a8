//! Best-effort recovery of a JSON object from free-form model output.
//!
//! The generative flavor only asks the model for bare JSON; it does not get a
//! provider-side structured-output guarantee. Models still wrap the object in
//! code fences, decorate it with Markdown, or surround it with prose. The
//! strategies below run in order until one yields a parseable object:
//!
//! 1. fenced text: drop the opening fence line and a trailing fence line
//! 2. otherwise: strip list, ordinal and bold markers line by line
//! 3. greedy `{ ... }` span extraction
//!
//! This is heuristic by nature. Text that merely looks like JSON inside prose
//! can still produce the wrong object.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").expect("list marker regex"));
static ORDINAL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+").expect("ordinal marker regex"));
static BOLD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\*\*(.*?)\*\*").expect("bold prefix regex"));
static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span regex"));

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("content is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Recover the JSON object embedded in `raw`.
pub fn recover_json(raw: &str) -> Result<Map<String, Value>, RecoveryError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("```") {
        strip_fence(trimmed)
    } else {
        strip_markdown(trimmed)
    };

    match parse_object(&candidate) {
        Ok(object) => Ok(object),
        Err(first_err) => match extract_brace_span(&candidate).or_else(|| extract_brace_span(trimmed)) {
            Some(span) => parse_object(span),
            None => Err(first_err),
        },
    }
}

/// Parse `text` as exactly one JSON object, with no recovery.
pub fn parse_object(text: &str) -> Result<Map<String, Value>, RecoveryError> {
    match serde_json::from_str::<Value>(text).map_err(RecoveryError::Parse)? {
        Value::Object(object) => Ok(object),
        other => Err(RecoveryError::NotAnObject(json_type_name(&other))),
    }
}

fn strip_fence(trimmed: &str) -> String {
    let mut lines: Vec<&str> = trimmed.lines().skip(1).collect();
    if lines
        .last()
        .is_some_and(|last| last.trim().starts_with("```"))
    {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

fn strip_markdown(text: &str) -> String {
    let text = LIST_MARKER.replace_all(text, "");
    let text = ORDINAL_MARKER.replace_all(&text, "");
    BOLD_PREFIX.replace_all(&text, "$1").into_owned()
}

fn extract_brace_span(text: &str) -> Option<&str> {
    BRACE_SPAN.find(text).map(|m| m.as_str())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BARE: &str =
        r#"{"items":[],"metadata":{},"usage":{"input_tokens":0,"output_tokens":0}}"#;

    #[test]
    fn test_bare_object_parses() {
        let object = recover_json(BARE).unwrap();
        assert_eq!(Value::Object(object), serde_json::from_str::<Value>(BARE).unwrap());
    }

    #[test]
    fn test_fenced_json_matches_unfenced() {
        let fenced = format!("```json\n{BARE}\n```");
        assert_eq!(recover_json(&fenced).unwrap(), recover_json(BARE).unwrap());
    }

    #[test]
    fn test_fence_without_closing_line() {
        let fenced = format!("```\n{BARE}\n");
        assert_eq!(recover_json(&fenced).unwrap(), recover_json(BARE).unwrap());
    }

    #[test]
    fn test_crlf_fence() {
        let fenced = format!("```json\r\n{BARE}\r\n```\r\n");
        assert_eq!(recover_json(&fenced).unwrap(), recover_json(BARE).unwrap());
    }

    #[test]
    fn test_leading_and_trailing_prose() {
        let text = format!("Here are the results:\n{BARE}\nLet me know if you need more.");
        assert_eq!(recover_json(&text).unwrap(), recover_json(BARE).unwrap());
    }

    #[test]
    fn test_markdown_decorations_are_stripped() {
        let text = "**Result**\n- {\"items\": [{\"title\": \"a\", \"url\": \"https://a.example\"}]}";
        let object = recover_json(text).unwrap();
        assert_eq!(
            object.get("items"),
            Some(&json!([{ "title": "a", "url": "https://a.example" }]))
        );
    }

    #[test]
    fn test_negative_numbers_survive_markdown_strip() {
        let text = "{\n  \"values\": [\n    -1,\n    2\n  ]\n}";
        let object = recover_json(text).unwrap();
        assert_eq!(object.get("values"), Some(&json!([-1, 2])));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = recover_json("not JSON at all").unwrap_err();
        assert!(matches!(err, RecoveryError::Parse(_)));
    }

    #[test]
    fn test_unbalanced_braces_are_a_parse_error() {
        let err = recover_json("prefix { \"items\": [ } suffix").unwrap_err();
        assert!(matches!(err, RecoveryError::Parse(_)));
    }

    #[test]
    fn test_parse_object_rejects_arrays() {
        let err = parse_object("[1, 2]").unwrap_err();
        assert!(matches!(err, RecoveryError::NotAnObject("array")));
    }
}
