//! Collaborator store contracts consumed by the synthesis engine
//!
//! The engine never talks to a commerce platform directly. It is handed two
//! capabilities: a [`ConfigStore`] with named opaque slots (one of which
//! holds the serialized reference registry) and a [`RecordStore`] that can
//! look up, create, and decorate the underlying commerce records. Hosts
//! implement these traits against their own storage; [`memory`] provides the
//! in-memory reference implementations used by the CLI and the test suite.

pub mod memory;

pub use memory::{MemoryConfigStore, MemoryRecordStore};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// An attribute operation addressed a record id the store does not know
    #[error("unknown record id {0}")]
    UnknownRecord(RecordId),

    /// Failure in the backing storage of a host-provided implementation
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an arbitrary backend failure
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Opaque numeric identifier assigned by the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Visible to the host's normal lookup path
    Published,
    /// Present in the store but not live
    Draft,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Published => write!(f, "published"),
            RecordStatus::Draft => write!(f, "draft"),
        }
    }
}

/// Auxiliary metadata on a record; a key may carry several ordered values
pub type AttributeMap = BTreeMap<String, Vec<serde_json::Value>>;

/// A commerce record as seen through the store boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Entity kind, e.g. `"coupon"`
    pub kind: String,
    /// Title, which doubles as the record's lookup identifier
    pub title: String,
    /// Publication state
    pub status: RecordStatus,
    /// Descriptive text; the part subject to placeholder substitution
    pub description: String,
}

/// The fields required to create a record
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Entity kind
    pub kind: String,
    /// Title / lookup identifier
    pub title: String,
    /// Publication state
    pub status: RecordStatus,
    /// Descriptive text
    pub description: String,
}

/// Named opaque configuration slots
pub trait ConfigStore {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Lookup, creation, and attribute access for commerce records
pub trait RecordStore {
    /// Find a record of `kind` whose title equals `title` exactly
    fn find_by_title(&self, kind: &str, title: &str) -> Result<Option<Record>, StoreError>;

    /// Create a record and return its assigned id
    fn create(&mut self, record: NewRecord) -> Result<RecordId, StoreError>;

    /// All attributes of a record
    fn attributes(&self, id: RecordId) -> Result<AttributeMap, StoreError>;

    /// Append one value under an attribute key
    fn add_attribute(
        &mut self,
        id: RecordId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError>;
}
