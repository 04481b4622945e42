//! # idsync-store
//!
//! Record model and store interface boundary for the idsync reconciliation
//! engine.
//!
//! The engine core never talks to a directory server or an HR database
//! directly; it consumes the capability traits defined here, and adapter
//! crates implement them against the real systems. This crate therefore
//! contains no transport code at all: just the shared [`Record`] shape,
//! the trait boundary and the error vocabulary.

pub mod error;
pub mod record;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use record::{fields, AttributeValue, GroupRef, OrgRef, Record, RecordKey};
pub use traits::{
    CrossReference, DirectoryStore, HrStore, RegistryLookup, RegistryPerson, ReportEnvelope,
    Reporter,
};
