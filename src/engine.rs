//! The synthesis engine: resolve a code and create its record on demand
//!
//! The engine owns the two collaborator stores and runs the guarded pipeline
//! that turns a failed coupon lookup into a freshly synthesized record: load
//! the registry, find the code, locate the named template, substitute the
//! line's variables into the description, create the record, and clone the
//! template's attributes onto it. Every early exit is an ordinary
//! [`CreationOutcome`], not an error.

use thiserror::Error;
use tracing::{debug, trace};

use crate::placeholder::substitute;
use crate::registry::{ReferenceRegistry, RegistryError};
use crate::store::{ConfigStore, NewRecord, RecordId, RecordStatus, RecordStore, StoreError};

/// Configuration slot that holds the serialized reference registry
pub const DEFAULT_REGISTRY_KEY: &str = "jit_references";

/// Record kind the engine looks up and creates
pub const DEFAULT_RECORD_KIND: &str = "coupon";

/// Errors from a synthesis attempt
#[derive(Debug, Error)]
pub enum EngineError {
    /// The reference registry failed to load
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A record store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Configuration key of the registry blob
    pub registry_key: String,
    /// Kind of record to look up and create
    pub record_kind: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            record_kind: DEFAULT_RECORD_KIND.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different configuration key for the registry blob
    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry_key = key.into();
        self
    }

    /// Synthesize records of a different kind
    pub fn with_record_kind(mut self, kind: impl Into<String>) -> Self {
        self.record_kind = kind.into();
        self
    }
}

/// How a synthesis attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    /// A record was created with this id
    Created(RecordId),
    /// No reference line matched the code
    NoMatch,
    /// A line matched but its template is absent or unnamed
    TemplateMissing,
    /// The target record already exists
    AlreadyExists,
}

impl CreationOutcome {
    /// Whether this outcome created a record
    pub fn created(&self) -> bool {
        matches!(self, CreationOutcome::Created(_))
    }
}

/// Just-in-time record synthesis over a pair of collaborator stores
#[derive(Debug)]
pub struct SynthesisEngine<C, R> {
    config: EngineConfig,
    config_store: C,
    records: R,
}

impl<C: ConfigStore, R: RecordStore> SynthesisEngine<C, R> {
    /// Create an engine with the default configuration
    pub fn new(config_store: C, records: R) -> Self {
        Self::with_config(EngineConfig::default(), config_store, records)
    }

    /// Create an engine with explicit configuration
    pub fn with_config(config: EngineConfig, config_store: C, records: R) -> Self {
        SynthesisEngine {
            config,
            config_store,
            records,
        }
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The configuration store
    pub fn config_store(&self) -> &C {
        &self.config_store
    }

    /// Mutable access to the configuration store
    pub fn config_store_mut(&mut self) -> &mut C {
        &mut self.config_store
    }

    /// The record store
    pub fn records(&self) -> &R {
        &self.records
    }

    /// Mutable access to the record store
    pub fn records_mut(&mut self) -> &mut R {
        &mut self.records
    }

    /// Consume the engine and hand the stores back
    pub fn into_parts(self) -> (C, R) {
        (self.config_store, self.records)
    }

    /// Lookup-miss hook: synthesize on `None`, pass existing data through
    ///
    /// Hosts call this from their record-lookup path. When `existing` is
    /// `Some` the engine does nothing and returns it unchanged. When it is
    /// `None` the engine attempts synthesis for its side effect and still
    /// returns `None`; the host's retry then finds the new record.
    pub fn maybe_create<T>(
        &mut self,
        existing: Option<T>,
        code: &str,
    ) -> Result<Option<T>, EngineError> {
        if existing.is_some() {
            return Ok(existing);
        }
        self.resolve_and_create(code)?;
        Ok(None)
    }

    /// Resolve `code` against the registry and create its record if possible
    pub fn resolve_and_create(&mut self, code: &str) -> Result<CreationOutcome, EngineError> {
        let registry = ReferenceRegistry::load(&self.config_store, &self.config.registry_key)?;

        let Some(matched) = registry.find(code) else {
            debug!(code, "no reference line matches");
            return Ok(CreationOutcome::NoMatch);
        };
        trace!(code, template = %matched.template_id, "reference line matched");

        // A row may carry codes without naming a template; the match still
        // ends the scan, it just cannot create anything.
        if matched.template_id.is_empty() {
            debug!(code, "matching reference names no template");
            return Ok(CreationOutcome::TemplateMissing);
        }

        let Some(template) = self
            .records
            .find_by_title(&self.config.record_kind, &matched.template_id)?
        else {
            debug!(code, template = %matched.template_id, "template record not found");
            return Ok(CreationOutcome::TemplateMissing);
        };

        // Guard against a record that appeared since the host's lookup miss.
        if self
            .records
            .find_by_title(&self.config.record_kind, code)?
            .is_some()
        {
            debug!(code, "record already exists");
            return Ok(CreationOutcome::AlreadyExists);
        }

        let description = substitute(&template.description, &matched.variables);
        let id = self.records.create(NewRecord {
            kind: template.kind.clone(),
            title: code.to_string(),
            status: RecordStatus::Published,
            description,
        })?;
        self.clone_attributes(template.id, id)?;

        debug!(code, id = %id, template = %matched.template_id, "synthesized record");
        Ok(CreationOutcome::Created(id))
    }

    /// Copy every attribute value from `from` onto `to`, order preserved
    fn clone_attributes(&mut self, from: RecordId, to: RecordId) -> Result<(), EngineError> {
        for (key, values) in self.records.attributes(from)? {
            for value in values {
                self.records.add_attribute(to, &key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryConfigStore, MemoryRecordStore};

    fn engine_with(
        rows: &[(&str, &str)],
        templates: &[(&str, &str)],
    ) -> SynthesisEngine<MemoryConfigStore, MemoryRecordStore> {
        let mut config_store = MemoryConfigStore::new();
        let rows: Vec<(String, String)> = rows
            .iter()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect();
        ReferenceRegistry::save(&mut config_store, DEFAULT_REGISTRY_KEY, &rows)
            .expect("Should save registry");

        let mut records = MemoryRecordStore::new();
        for (title, description) in templates {
            records
                .create(NewRecord {
                    kind: DEFAULT_RECORD_KIND.to_string(),
                    title: title.to_string(),
                    status: RecordStatus::Published,
                    description: description.to_string(),
                })
                .expect("Should create template");
        }

        SynthesisEngine::new(config_store, records)
    }

    #[test]
    fn test_template_lookup_precedes_existence_check() {
        // The code itself already exists as a record, but the reference
        // names an absent template. The pipeline must report the missing
        // template, not the existing record.
        let mut engine = engine_with(&[("GONE", "Dup")], &[("Dup", "existing")]);

        let outcome = engine.resolve_and_create("Dup").expect("Should resolve");
        assert_eq!(outcome, CreationOutcome::TemplateMissing);
    }

    #[test]
    fn test_row_without_template_still_ends_the_scan() {
        // "X" appears first in a template-less row and again in a complete
        // row. The first match wins, so nothing is created.
        let mut engine = engine_with(&[("", "X"), ("TPL", "X")], &[("TPL", "t")]);

        let outcome = engine.resolve_and_create("X").expect("Should resolve");
        assert_eq!(outcome, CreationOutcome::TemplateMissing);
        assert_eq!(engine.records().len(), 1);
    }

    #[test]
    fn test_created_reports_as_created() {
        let mut engine = engine_with(&[("TPL", "New1")], &[("TPL", "t")]);

        let outcome = engine.resolve_and_create("New1").expect("Should resolve");
        assert!(outcome.created());
        assert!(matches!(outcome, CreationOutcome::Created(id) if id == RecordId(2)));

        let outcome = engine.resolve_and_create("Absent").expect("Should resolve");
        assert!(!outcome.created());
    }

    #[test]
    fn test_unset_registry_slot_yields_no_match() {
        let mut engine =
            SynthesisEngine::new(MemoryConfigStore::new(), MemoryRecordStore::new());

        let outcome = engine.resolve_and_create("Any").expect("Should resolve");
        assert_eq!(outcome, CreationOutcome::NoMatch);
    }

    #[test]
    fn test_custom_config_changes_key_and_kind() {
        let config = EngineConfig::new()
            .with_registry_key("alt_slot")
            .with_record_kind("voucher");

        let mut config_store = MemoryConfigStore::new();
        ReferenceRegistry::save(
            &mut config_store,
            "alt_slot",
            &[("TPL".to_string(), "V1".to_string())],
        )
        .expect("Should save registry");

        let mut records = MemoryRecordStore::new();
        records
            .create(NewRecord {
                kind: "voucher".to_string(),
                title: "TPL".to_string(),
                status: RecordStatus::Published,
                description: "v".to_string(),
            })
            .expect("Should create template");

        let mut engine = SynthesisEngine::with_config(config, config_store, records);
        let outcome = engine.resolve_and_create("V1").expect("Should resolve");
        assert!(outcome.created());

        let created = engine
            .records()
            .find_by_title("voucher", "V1")
            .expect("Should look up")
            .expect("Should exist");
        assert_eq!(created.kind, "voucher");
    }
}
