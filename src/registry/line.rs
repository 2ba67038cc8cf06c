//! Child-line parsing
//!
//! Each non-empty line of a reference's code block names one child code,
//! optionally followed by a JSON object of per-code variables:
//!
//! ```text
//! Darko25 {"presentername": "Darko Novak"}
//! ```
//!
//! A line that does not fit that shape is treated as a bare code with no
//! variables, so a typo in the payload degrades the line rather than the
//! whole registry.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\{.*\})$").expect("line pattern is valid"));

/// One parsed child line: a code and its substitution variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLine {
    /// The child coupon code
    pub code: String,
    /// Variables bound for this code; empty when the payload is absent or malformed
    pub variables: HashMap<String, String>,
}

impl ChildLine {
    /// Parse a single registry line
    ///
    /// The line is trimmed first. If it matches `code {json}` the payload is
    /// decoded; otherwise the entire trimmed line becomes the code. A payload
    /// that is not a JSON object yields no variables.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match LINE_PATTERN.captures(trimmed) {
            Some(captures) => ChildLine {
                code: captures[1].to_string(),
                variables: decode_payload(&captures[2]),
            },
            None => ChildLine {
                code: trimmed.to_string(),
                variables: HashMap::new(),
            },
        }
    }
}

fn decode_payload(payload: &str) -> HashMap<String, String> {
    let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(payload) else {
        return HashMap::new();
    };
    fields
        .into_iter()
        .map(|(key, value)| (key, coerce_value(value)))
        .collect()
}

/// Flatten a JSON value into the string form used for substitution
fn coerce_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        // Arrays and nested objects keep their JSON text
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_code_has_no_variables() {
        let line = ChildLine::parse("SUMMER24");
        assert_eq!(line.code, "SUMMER24");
        assert!(line.variables.is_empty());
    }

    #[test]
    fn test_code_with_payload() {
        let line = ChildLine::parse(r#"Darko25 {"presentername": "Darko Novak"}"#);
        assert_eq!(line.code, "Darko25");
        assert_eq!(
            line.variables.get("presentername"),
            Some(&"Darko Novak".to_string())
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let line = ChildLine::parse("   SUMMER24   ");
        assert_eq!(line.code, "SUMMER24");

        let line = ChildLine::parse("\tCode1 {\"a\": \"b\"}  ");
        assert_eq!(line.code, "Code1");
        assert_eq!(line.variables.get("a"), Some(&"b".to_string()));
    }

    #[test]
    fn test_malformed_payload_yields_empty_variables() {
        let line = ChildLine::parse("ABC {not valid json}");
        assert_eq!(line.code, "ABC");
        assert!(line.variables.is_empty());
    }

    #[test]
    fn test_non_object_payload_yields_empty_variables() {
        let line = ChildLine::parse(r#"ABC {"lone string"}"#);
        assert_eq!(line.code, "ABC");
        assert!(line.variables.is_empty());
    }

    #[test]
    fn test_unterminated_payload_becomes_part_of_the_code() {
        // Without a closing brace the line shape is not met, so the whole
        // trimmed line is the code.
        let line = ChildLine::parse("ABC {unterminated");
        assert_eq!(line.code, "ABC {unterminated");
        assert!(line.variables.is_empty());
    }

    #[test]
    fn test_trailing_text_after_payload_defeats_the_shape() {
        let line = ChildLine::parse(r#"ABC {"a": "b"} extra"#);
        assert_eq!(line.code, r#"ABC {"a": "b"} extra"#);
        assert!(line.variables.is_empty());
    }

    #[test]
    fn test_scalar_values_are_coerced_to_strings() {
        let line =
            ChildLine::parse(r#"C1 {"count": 3, "ratio": 2.5, "on": true, "gone": null}"#);
        assert_eq!(line.variables.get("count"), Some(&"3".to_string()));
        assert_eq!(line.variables.get("ratio"), Some(&"2.5".to_string()));
        assert_eq!(line.variables.get("on"), Some(&"true".to_string()));
        assert_eq!(line.variables.get("gone"), Some(&"".to_string()));
    }

    #[test]
    fn test_nested_values_keep_their_json_text() {
        let line = ChildLine::parse(r#"C1 {"tags": ["a","b"]}"#);
        assert_eq!(line.variables.get("tags"), Some(&r#"["a","b"]"#.to_string()));
    }

    #[test]
    fn test_empty_line_parses_to_empty_code() {
        let line = ChildLine::parse("   ");
        assert_eq!(line.code, "");
        assert!(line.variables.is_empty());
    }
}
