//! In-memory store implementations
//!
//! Back the [`ConfigStore`] and [`RecordStore`] contracts with plain maps
//! and vectors. Both types serialize, so the CLI can persist a whole store
//! as one JSON document and reload it on the next invocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    AttributeMap, ConfigStore, NewRecord, Record, RecordId, RecordStore, StoreError,
};

/// [`ConfigStore`] backed by a string map
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryConfigStore {
    values: BTreeMap<String, String>,
}

impl MemoryConfigStore {
    /// Create an empty config store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    record: Record,
    #[serde(default)]
    attributes: AttributeMap,
}

/// [`RecordStore`] backed by a vector in creation order
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryRecordStore {
    records: Vec<StoredRecord>,
    next_id: u64,
}

impl MemoryRecordStore {
    /// Create an empty record store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn entry(&self, id: RecordId) -> Result<&StoredRecord, StoreError> {
        self.records
            .iter()
            .find(|stored| stored.record.id == id)
            .ok_or(StoreError::UnknownRecord(id))
    }

    fn entry_mut(&mut self, id: RecordId) -> Result<&mut StoredRecord, StoreError> {
        self.records
            .iter_mut()
            .find(|stored| stored.record.id == id)
            .ok_or(StoreError::UnknownRecord(id))
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_by_title(&self, kind: &str, title: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|stored| stored.record.kind == kind && stored.record.title == title)
            .map(|stored| stored.record.clone()))
    }

    fn create(&mut self, record: NewRecord) -> Result<RecordId, StoreError> {
        self.next_id += 1;
        let id = RecordId(self.next_id);
        self.records.push(StoredRecord {
            record: Record {
                id,
                kind: record.kind,
                title: record.title,
                status: record.status,
                description: record.description,
            },
            attributes: AttributeMap::new(),
        });
        Ok(id)
    }

    fn attributes(&self, id: RecordId) -> Result<AttributeMap, StoreError> {
        Ok(self.entry(id)?.attributes.clone())
    }

    fn add_attribute(
        &mut self,
        id: RecordId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.entry_mut(id)?
            .attributes
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }
}
