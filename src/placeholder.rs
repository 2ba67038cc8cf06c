//! Placeholder substitution for record descriptions
//!
//! Templates embed `{name}` placeholders in their descriptive text. During
//! synthesis each placeholder is replaced with the variable bound on the
//! matching child line; placeholders with no binding are deleted. The text
//! is rewritten in a single pass, so substituted values are never rescanned
//! for further placeholders.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::store::AttributeMap;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Replace every `{name}` in `text` with its value from `variables`
///
/// Unbound placeholders become the empty string. The literal `{}` carries no
/// name and is left untouched.
pub fn substitute(text: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(text, |captures: &regex::Captures<'_>| {
            variables.get(&captures[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Apply [`substitute`] to the string values stored under `keys`
///
/// Attribute values that are not strings, and attributes whose key is not
/// listed, pass through unchanged. The default synthesis path clones
/// attributes verbatim; hosts that want substitution inside selected
/// attributes can run this over the clone before writing it back.
pub fn substitute_attributes(
    attributes: &AttributeMap,
    keys: &[&str],
    variables: &HashMap<String, String>,
) -> AttributeMap {
    attributes
        .iter()
        .map(|(key, values)| {
            if !keys.contains(&key.as_str()) {
                return (key.clone(), values.clone());
            }
            let rewritten = values
                .iter()
                .map(|value| match value {
                    serde_json::Value::String(s) => {
                        serde_json::Value::String(substitute(s, variables))
                    }
                    other => other.clone(),
                })
                .collect();
            (key.clone(), rewritten)
        })
        .collect()
}
