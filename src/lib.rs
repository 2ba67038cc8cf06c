//! jit-coupons - Just-in-time coupon synthesis from reference templates
//!
//! When a shopper enters a coupon code that does not exist yet, this engine
//! consults an operator-maintained reference registry, finds the template
//! record the code belongs to, and materializes a real record on the spot:
//! description placeholders filled from the code's variables, attributes
//! cloned from the template. The host platform stays behind two small
//! traits, [`ConfigStore`] and [`RecordStore`].
//!
//! # Example
//!
//! ```rust
//! use jit_coupons::{
//!     MemoryConfigStore, MemoryRecordStore, NewRecord, RecordStatus, RecordStore,
//!     ReferenceRegistry, SynthesisEngine, DEFAULT_RECORD_KIND, DEFAULT_REGISTRY_KEY,
//! };
//!
//! let mut config = MemoryConfigStore::new();
//! let mut records = MemoryRecordStore::new();
//!
//! records
//!     .create(NewRecord {
//!         kind: DEFAULT_RECORD_KIND.to_string(),
//!         title: "SPEAKER15".to_string(),
//!         status: RecordStatus::Published,
//!         description: "15% discount for speaker {presentername}".to_string(),
//!     })
//!     .unwrap();
//!
//! ReferenceRegistry::save(
//!     &mut config,
//!     DEFAULT_REGISTRY_KEY,
//!     &[(
//!         "SPEAKER15".to_string(),
//!         "Darko25 {\"presentername\": \"Darko Novak\"}".to_string(),
//!     )],
//! )
//! .unwrap();
//!
//! let mut engine = SynthesisEngine::new(config, records);
//! let outcome = engine.resolve_and_create("Darko25").unwrap();
//! assert!(outcome.created());
//!
//! let coupon = engine
//!     .records()
//!     .find_by_title(DEFAULT_RECORD_KIND, "Darko25")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(coupon.description, "15% discount for speaker Darko Novak");
//! ```

pub mod engine;
pub mod placeholder;
pub mod registry;
pub mod store;

pub use engine::{
    CreationOutcome, EngineConfig, EngineError, SynthesisEngine, DEFAULT_RECORD_KIND,
    DEFAULT_REGISTRY_KEY,
};
pub use placeholder::{substitute, substitute_attributes};
pub use registry::{ChildLine, CodeMatch, Reference, ReferenceRegistry, RegistryError};
pub use store::{
    AttributeMap, ConfigStore, MemoryConfigStore, MemoryRecordStore, NewRecord, Record, RecordId,
    RecordStatus, RecordStore, StoreError,
};
