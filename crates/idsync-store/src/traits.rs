//! Store boundary traits.
//!
//! Capability traits for the external systems the reconciliation core talks
//! to. The core only ever sees these interfaces; transport, authentication
//! and the client libraries behind them live in the adapter crates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::StoreResult;
use crate::record::{GroupRef, Record, RecordKey};

/// The directory-style identity store (LDAP-like).
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Fetch all records modified strictly after the given timestamp.
    async fn fetch_modified_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<Record>>;

    /// Fetch a single record by key. Unknown keys yield `Ok(None)`.
    async fn fetch_by_key(&self, key: &RecordKey) -> StoreResult<Option<Record>>;

    /// Resolve a group to the set of member record keys.
    ///
    /// Returns [`crate::StoreError::GroupNotFound`] when the group does not
    /// exist in the directory.
    async fn fetch_group_members(&self, group: &GroupRef) -> StoreResult<BTreeSet<RecordKey>>;

    /// Persist a record back to the directory.
    async fn save(&self, record: &Record) -> StoreResult<()>;

    /// Remove a record from the directory.
    async fn delete(&self, key: &RecordKey) -> StoreResult<()>;
}

/// The human-resources record store.
#[async_trait]
pub trait HrStore: Send + Sync {
    /// Fetch all records modified strictly after the given timestamp.
    ///
    /// With `active_only` set, the store pre-filters to records flagged
    /// active on the HR side. Records without a directory account name are
    /// never returned; the shared [`RecordKey`] is that account name.
    async fn fetch_modified_since(
        &self,
        since: DateTime<Utc>,
        active_only: bool,
    ) -> StoreResult<Vec<Record>>;

    /// Persist a record back to the HR store.
    ///
    /// `cascade` also writes dependent rows (employment history) the way
    /// the HR system expects.
    async fn save(&self, record: &Record, cascade: bool) -> StoreResult<()>;
}

/// Cross-reference between directory keys and HR-side identifiers.
///
/// Absence is an answer, not an error: an unresolvable reference yields
/// `Ok(None)` and callers skip the affected field or pair.
#[async_trait]
pub trait CrossReference: Send + Sync {
    /// Resolve an HR-side identifier (e.g., a leader's employee id) to the
    /// directory key of the same person.
    async fn directory_key_for_hr(&self, hr_id: &str) -> StoreResult<Option<RecordKey>>;

    /// Resolve a directory key (or a distinguished name carried in a
    /// directory attribute) to the HR record of the same person.
    async fn hr_record_for_directory_key(&self, key: &RecordKey) -> StoreResult<Option<Record>>;
}

/// A person as known by the national civil registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPerson {
    /// First name.
    pub first_name: String,
    /// Middle name(s), empty when absent.
    #[serde(default)]
    pub middle_name: String,
    /// Last name.
    pub last_name: String,
    /// Full name as registered.
    pub full_name: String,
}

impl RegistryPerson {
    /// The given-name form written to the stores: first and middle name
    /// joined, trimmed.
    #[must_use]
    pub fn given_name(&self) -> String {
        format!("{} {}", self.first_name, self.middle_name)
            .trim()
            .to_string()
    }
}

/// Lookup into the national civil registry, keyed by national id.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Look a person up by national id. Unknown ids yield `Ok(None)`.
    async fn lookup(&self, national_id: &str) -> StoreResult<Option<RegistryPerson>>;
}

/// Envelope handed to the reporting collaborator.
///
/// The body is an opaque, already-rendered summary; delivery mechanics
/// (mail, chat, ticketing) are entirely the collaborator's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope {
    /// Recipients, empty to use the collaborator's default.
    pub recipients: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Report body.
    pub body: String,
}

impl ReportEnvelope {
    /// Create a new envelope.
    pub fn new(
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipients,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Delivery of run reports and error notifications.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Deliver a run report.
    async fn deliver(&self, envelope: &ReportEnvelope) -> StoreResult<()>;

    /// Deliver a best-effort error notification. Implementations should
    /// not fail loudly; the caller is already handling an error.
    async fn deliver_error(&self, subject: &str, message: &str) -> StoreResult<()> {
        self.deliver(&ReportEnvelope::new(Vec::new(), subject, message))
            .await
    }
}
