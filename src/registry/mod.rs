//! Reference registry: the mapping from child codes to template records
//!
//! Operators maintain an ordered list of references. Each reference names a
//! template record and carries a multi-line block of child codes, one per
//! line, optionally annotated with JSON variables (see [`line`]). The whole
//! list persists as a single JSON blob under one configuration key, so a
//! registry edit is one read-modify-write of that slot.

pub mod line;

pub use line::ChildLine;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::store::{ConfigStore, StoreError};

/// Errors from loading or saving the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The configuration store failed
    #[error("config store error: {0}")]
    Store(#[from] StoreError),

    /// The stored blob is not valid registry JSON
    #[error("malformed reference registry blob: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One registry row: a template and the child codes it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Title of the template record to clone from
    pub template_id: String,
    /// Newline-separated child-code lines, stored verbatim
    pub raw_codes: String,
}

/// The outcome of a successful code lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeMatch {
    /// Template named by the matching reference; may be empty
    pub template_id: String,
    /// Variables bound on the matching child line
    pub variables: HashMap<String, String>,
}

/// Ordered list of references with persistence helpers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRegistry {
    references: Vec<Reference>,
}

impl ReferenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already-sanitized references
    pub fn from_references(references: Vec<Reference>) -> Self {
        Self { references }
    }

    /// Load the registry stored under `key`, or an empty one if the slot is unset
    pub fn load<C: ConfigStore>(store: &C, key: &str) -> Result<Self, RegistryError> {
        let Some(blob) = store.get(key)? else {
            return Ok(Self::new());
        };
        let references: Vec<Reference> =
            serde_json::from_str(&blob).map_err(RegistryError::Decode)?;
        trace!(rows = references.len(), "loaded reference registry");
        Ok(Self { references })
    }

    /// Sanitize `rows` of `(template_id, raw_codes)`, persist them under `key`,
    /// and return the registry as stored
    ///
    /// Template ids lose control characters and have whitespace runs collapsed;
    /// code blocks keep newlines and tabs but are normalized to `\n` endings.
    /// Rows where both fields sanitize to empty are dropped.
    pub fn save<C: ConfigStore>(
        store: &mut C,
        key: &str,
        rows: &[(String, String)],
    ) -> Result<Self, RegistryError> {
        let references: Vec<Reference> = rows
            .iter()
            .map(|(template_id, raw_codes)| Reference {
                template_id: sanitize_single_line(template_id),
                raw_codes: sanitize_multi_line(raw_codes),
            })
            .filter(|r| !r.template_id.is_empty() || !r.raw_codes.is_empty())
            .collect();

        let blob = serde_json::to_string(&references).expect("reference rows always serialize");
        store.set(key, &blob)?;
        trace!(rows = references.len(), "saved reference registry");
        Ok(Self { references })
    }

    /// The rows in storage order
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Whether the registry holds no rows
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Find the first child line across all references whose code equals `code`
    ///
    /// References are scanned in storage order and lines top to bottom; the
    /// first hit wins and the scan stops, even if the owning reference names
    /// no template.
    pub fn find(&self, code: &str) -> Option<CodeMatch> {
        for reference in &self.references {
            for raw_line in reference.raw_codes.split(['\r', '\n']) {
                let raw_line = raw_line.trim();
                if raw_line.is_empty() {
                    continue;
                }
                let parsed = ChildLine::parse(raw_line);
                if parsed.code == code {
                    return Some(CodeMatch {
                        template_id: reference.template_id.clone(),
                        variables: parsed.variables,
                    });
                }
            }
        }
        None
    }
}

/// Strip control characters and collapse whitespace runs to single spaces
fn sanitize_single_line(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if ch.is_control() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// Normalize line endings to `\n` and strip control characters other than
/// newline and tab
fn sanitize_multi_line(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    let cleaned: String = normalized
        .chars()
        .filter(|ch| *ch == '\n' || *ch == '\t' || !ch.is_control())
        .collect();
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfigStore;

    const KEY: &str = "jit_references";

    #[test]
    fn test_load_from_unset_slot_is_empty() {
        let store = MemoryConfigStore::new();
        let registry = ReferenceRegistry::load(&store, KEY).expect("Should load");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_rejects_corrupt_blob() {
        let mut store = MemoryConfigStore::new();
        store.set(KEY, "{ not json").expect("Should write");

        let err = ReferenceRegistry::load(&store, KEY).expect_err("Should reject");
        assert!(matches!(err, RegistryError::Decode(_)));
    }

    #[test]
    fn test_find_returns_first_match_in_storage_order() {
        let registry = ReferenceRegistry::from_references(vec![
            Reference {
                template_id: "FIRST".to_string(),
                raw_codes: "shared".to_string(),
            },
            Reference {
                template_id: "SECOND".to_string(),
                raw_codes: "shared\nunique".to_string(),
            },
        ]);

        let hit = registry.find("shared").expect("Should match");
        assert_eq!(hit.template_id, "FIRST");

        let hit = registry.find("unique").expect("Should match");
        assert_eq!(hit.template_id, "SECOND");
    }

    #[test]
    fn test_find_skips_blank_lines_and_handles_crlf() {
        let registry = ReferenceRegistry::from_references(vec![Reference {
            template_id: "TPL".to_string(),
            raw_codes: "\r\n  \r\nAlpha\r\nBeta {\"x\": \"1\"}\r\n".to_string(),
        }]);

        assert!(registry.find("Alpha").is_some());
        let hit = registry.find("Beta").expect("Should match");
        assert_eq!(hit.variables.get("x"), Some(&"1".to_string()));
        assert!(registry.find("").is_none());
    }

    #[test]
    fn test_find_misses_when_no_line_matches() {
        let registry = ReferenceRegistry::from_references(vec![Reference {
            template_id: "TPL".to_string(),
            raw_codes: "Alpha".to_string(),
        }]);
        assert!(registry.find("alpha").is_none());
    }

    #[test]
    fn test_save_drops_rows_that_sanitize_to_nothing() {
        let mut store = MemoryConfigStore::new();
        let rows = vec![
            ("".to_string(), "".to_string()),
            ("TPL".to_string(), "".to_string()),
            ("".to_string(), "Orphan".to_string()),
            ("  ".to_string(), "\r\n".to_string()),
        ];

        let registry = ReferenceRegistry::save(&mut store, KEY, &rows).expect("Should save");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.references()[0].template_id, "TPL");
        assert_eq!(registry.references()[1].raw_codes, "Orphan");
    }

    #[test]
    fn test_sanitize_single_line_collapses_whitespace() {
        assert_eq!(sanitize_single_line("  My\tTemplate \n Coupon "), "My Template Coupon");
        assert_eq!(sanitize_single_line("plain"), "plain");
        assert_eq!(sanitize_single_line("\u{7}bell\u{7}"), "bell");
    }

    #[test]
    fn test_sanitize_multi_line_normalizes_endings() {
        assert_eq!(
            sanitize_multi_line("a\r\nb\rc\nd"),
            "a\nb\nc\nd"
        );
        assert_eq!(
            sanitize_multi_line("\nCode {\"k\": \"v\"}\u{0}\n"),
            "Code {\"k\": \"v\"}"
        );
        // Interior tabs survive; the block is only trimmed at its ends
        assert_eq!(sanitize_multi_line("a\tb\n"), "a\tb");
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let mut store = MemoryConfigStore::new();
        let rows = vec![(
            "TPL".to_string(),
            "Foo\r\nBar {\"x\": \"1\"}".to_string(),
        )];

        let saved = ReferenceRegistry::save(&mut store, KEY, &rows).expect("Should save");
        let loaded = ReferenceRegistry::load(&store, KEY).expect("Should load");
        assert_eq!(saved, loaded);

        let hit = loaded.find("Bar").expect("Should match after round trip");
        assert_eq!(hit.template_id, "TPL");
        assert_eq!(hit.variables.get("x"), Some(&"1".to_string()));
    }
}
