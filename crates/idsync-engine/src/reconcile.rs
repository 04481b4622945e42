//! Per-field reconciliation.
//!
//! One mapping, one record pair, at most one change. The direction names
//! the authoritative side; the emitted change always mutates the other
//! side.

use tracing::debug;

use idsync_store::{fields, CrossReference, Record, RecordKey};

use crate::change::{ChangeRecord, TargetSide};
use crate::error::SyncResult;
use crate::mapping::{FieldKind, FieldMapping, SyncDirection};
use crate::normalize::Normalizer;

/// Compare a current value against a desired value and stage a change when
/// their normalized forms differ.
///
/// This is the shared primitive under both the pairwise reconciler and the
/// registry synchronization: `current` is what the target side holds,
/// `desired` is the authoritative raw value.
#[must_use]
pub fn reconcile_value(
    side: TargetSide,
    key: &RecordKey,
    field: &str,
    normalizer: Normalizer,
    current: Option<&str>,
    desired: &str,
) -> Option<ChangeRecord> {
    let current_form = normalizer.compare_form(current.unwrap_or(""));
    let desired_form = normalizer.compare_form(desired);

    if current_form == desired_form {
        return None;
    }

    Some(ChangeRecord::new(
        side,
        key.clone(),
        field,
        current.map(ToString::to_string),
        normalizer.write_form(desired),
    ))
}

/// Reconciles one mapped field across a record pair.
pub struct FieldReconciler<'x, X: CrossReference + ?Sized> {
    xref: &'x X,
}

impl<'x, X: CrossReference + ?Sized> FieldReconciler<'x, X> {
    /// Create a reconciler over the given cross-reference.
    pub fn new(xref: &'x X) -> Self {
        Self { xref }
    }

    /// Reconcile one field of a pair.
    ///
    /// Returns `Ok(None)` when the field is disabled, already consistent,
    /// or a manager reference cannot be resolved (skipped, best effort).
    pub async fn reconcile(
        &self,
        directory: &Record,
        hr: &Record,
        mapping: &FieldMapping,
    ) -> SyncResult<Option<ChangeRecord>> {
        if mapping.direction == SyncDirection::Disabled {
            return Ok(None);
        }

        match mapping.kind {
            FieldKind::Plain => Ok(self.reconcile_plain(directory, hr, mapping)),
            FieldKind::Manager => self.reconcile_manager(directory, hr, mapping).await,
        }
    }

    fn reconcile_plain(
        &self,
        directory: &Record,
        hr: &Record,
        mapping: &FieldMapping,
    ) -> Option<ChangeRecord> {
        match mapping.direction {
            SyncDirection::DirectoryWins => reconcile_value(
                TargetSide::HrStore,
                &hr.key,
                &mapping.field,
                mapping.normalizer,
                hr.get_str(&mapping.hr_attribute),
                directory.get_str(&mapping.directory_attribute).unwrap_or(""),
            ),
            SyncDirection::HrWins => reconcile_value(
                TargetSide::Directory,
                &directory.key,
                &mapping.field,
                mapping.normalizer,
                directory.get_str(&mapping.directory_attribute),
                hr.get_str(&mapping.hr_attribute).unwrap_or(""),
            ),
            SyncDirection::Disabled => None,
        }
    }

    /// Manager fields hold a reference, not a value: a distinguished name
    /// on the directory side, a leader employee id on the HR side. The
    /// authoritative reference is translated through the cross-reference
    /// before comparison; an unresolvable reference skips the field.
    async fn reconcile_manager(
        &self,
        directory: &Record,
        hr: &Record,
        mapping: &FieldMapping,
    ) -> SyncResult<Option<ChangeRecord>> {
        match mapping.direction {
            SyncDirection::DirectoryWins => {
                let Some(manager_dn) = non_empty(directory.get_str(&mapping.directory_attribute))
                else {
                    return Ok(None);
                };

                let Some(manager_hr) = self
                    .xref
                    .hr_record_for_directory_key(&RecordKey::new(manager_dn))
                    .await?
                else {
                    debug!(key = %directory.key, manager = %manager_dn, "Manager has no HR record, skipping field");
                    return Ok(None);
                };

                let Some(leader_id) = non_empty(manager_hr.get_str(fields::EMPLOYEE_ID)) else {
                    return Ok(None);
                };

                Ok(reconcile_value(
                    TargetSide::HrStore,
                    &hr.key,
                    &mapping.field,
                    Normalizer::Text,
                    hr.get_str(&mapping.hr_attribute),
                    leader_id,
                ))
            }
            SyncDirection::HrWins => {
                let Some(leader_id) = non_empty(hr.get_str(&mapping.hr_attribute)) else {
                    return Ok(None);
                };

                let Some(manager_key) = self.xref.directory_key_for_hr(leader_id).await? else {
                    debug!(key = %hr.key, leader = %leader_id, "Leader has no directory account, skipping field");
                    return Ok(None);
                };

                Ok(reconcile_value(
                    TargetSide::Directory,
                    &directory.key,
                    &mapping.field,
                    Normalizer::Text,
                    directory.get_str(&mapping.directory_attribute),
                    manager_key.as_str(),
                ))
            }
            SyncDirection::Disabled => Ok(None),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use idsync_store::StoreResult;
    use std::collections::HashMap;

    struct StubXref {
        hr_by_dn: HashMap<String, Record>,
        key_by_id: HashMap<String, RecordKey>,
    }

    impl StubXref {
        fn empty() -> Self {
            Self {
                hr_by_dn: HashMap::new(),
                key_by_id: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl CrossReference for StubXref {
        async fn directory_key_for_hr(&self, hr_id: &str) -> StoreResult<Option<RecordKey>> {
            Ok(self.key_by_id.get(hr_id).cloned())
        }

        async fn hr_record_for_directory_key(
            &self,
            key: &RecordKey,
        ) -> StoreResult<Option<Record>> {
            Ok(self.hr_by_dn.get(key.as_str()).cloned())
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn pair(directory_value: Option<&str>, hr_value: Option<&str>) -> (Record, Record) {
        let mut directory = Record::new("jdoe", at());
        if let Some(v) = directory_value {
            directory.set("givenName", v);
        }
        let mut hr = Record::new("jdoe", at());
        if let Some(v) = hr_value {
            hr.set("first_name", v);
        }
        (directory, hr)
    }

    fn given_name(direction: SyncDirection) -> FieldMapping {
        FieldMapping::plain("givenName", "givenName", "first_name").with_direction(direction)
    }

    #[tokio::test]
    async fn test_directory_wins_mutates_hr_side() {
        let (directory, hr) = pair(Some("Anna"), Some("Ann"));
        let xref = StubXref::empty();
        let reconciler = FieldReconciler::new(&xref);

        let change = reconciler
            .reconcile(&directory, &hr, &given_name(SyncDirection::DirectoryWins))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(change.side, TargetSide::HrStore);
        assert_eq!(change.old.as_deref(), Some("Ann"));
        assert_eq!(change.new, "Anna");
    }

    #[tokio::test]
    async fn test_hr_wins_mutates_directory_side() {
        let (directory, hr) = pair(Some("Anna"), Some("Ann"));
        let xref = StubXref::empty();
        let reconciler = FieldReconciler::new(&xref);

        let change = reconciler
            .reconcile(&directory, &hr, &given_name(SyncDirection::HrWins))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(change.side, TargetSide::Directory);
        assert_eq!(change.old.as_deref(), Some("Anna"));
        assert_eq!(change.new, "Ann");
    }

    #[tokio::test]
    async fn test_disabled_never_reconciles() {
        let (directory, hr) = pair(Some("Anna"), Some("Ann"));
        let xref = StubXref::empty();
        let reconciler = FieldReconciler::new(&xref);

        let change = reconciler
            .reconcile(&directory, &hr, &given_name(SyncDirection::Disabled))
            .await
            .unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn test_equal_after_normalization_is_a_noop() {
        let mut directory = Record::new("jdoe", at());
        directory.set("telephoneNumber", "12345678");
        let mut hr = Record::new("jdoe", at());
        hr.set("phone", "12 34 56 78");

        let mapping = FieldMapping::plain("telephone", "telephoneNumber", "phone")
            .with_normalizer(Normalizer::Phone)
            .with_direction(SyncDirection::DirectoryWins);

        let xref = StubXref::empty();
        let reconciler = FieldReconciler::new(&xref);
        let change = reconciler.reconcile(&directory, &hr, &mapping).await.unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn test_authoritative_blank_clears_target() {
        let (directory, hr) = pair(None, Some("Ann"));
        let xref = StubXref::empty();
        let reconciler = FieldReconciler::new(&xref);

        let change = reconciler
            .reconcile(&directory, &hr, &given_name(SyncDirection::DirectoryWins))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.new, "");

        // Unset on both sides stays untouched.
        let (directory, hr) = pair(None, None);
        let change = reconciler
            .reconcile(&directory, &hr, &given_name(SyncDirection::DirectoryWins))
            .await
            .unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn test_manager_resolves_through_cross_reference() {
        let manager_dn = "CN=Boss,OU=Users,DC=example,DC=org";
        let mut directory = Record::new("jdoe", at());
        directory.set("manager", manager_dn);
        let mut hr = Record::new("jdoe", at());
        hr.set("leader_id", "E-100");

        let mut xref = StubXref::empty();
        let boss = Record::new("boss", at()).with(fields::EMPLOYEE_ID, "E-200");
        xref.hr_by_dn.insert(manager_dn.to_string(), boss);

        let mapping = FieldMapping::manager("manager", "manager", "leader_id")
            .with_direction(SyncDirection::DirectoryWins);

        let reconciler = FieldReconciler::new(&xref);
        let change = reconciler
            .reconcile(&directory, &hr, &mapping)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(change.side, TargetSide::HrStore);
        assert_eq!(change.new, "E-200");
    }

    #[tokio::test]
    async fn test_manager_unresolvable_is_skipped_silently() {
        let mut directory = Record::new("jdoe", at());
        directory.set("manager", "CN=Ghost,OU=Users,DC=example,DC=org");
        let hr = Record::new("jdoe", at());

        let mapping = FieldMapping::manager("manager", "manager", "leader_id")
            .with_direction(SyncDirection::DirectoryWins);

        let xref = StubXref::empty();
        let reconciler = FieldReconciler::new(&xref);
        let change = reconciler.reconcile(&directory, &hr, &mapping).await.unwrap();
        assert!(change.is_none());
    }

    #[tokio::test]
    async fn test_manager_hr_wins_writes_directory_key() {
        let mut directory = Record::new("jdoe", at());
        directory.set("manager", "CN=Old,OU=Users,DC=example,DC=org");
        let mut hr = Record::new("jdoe", at());
        hr.set("leader_id", "E-200");

        let mut xref = StubXref::empty();
        xref.key_by_id.insert(
            "E-200".to_string(),
            RecordKey::new("CN=Boss,OU=Users,DC=example,DC=org"),
        );

        let mapping = FieldMapping::manager("manager", "manager", "leader_id")
            .with_direction(SyncDirection::HrWins);

        let reconciler = FieldReconciler::new(&xref);
        let change = reconciler
            .reconcile(&directory, &hr, &mapping)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(change.side, TargetSide::Directory);
        assert_eq!(change.new, "CN=Boss,OU=Users,DC=example,DC=org");
    }

    #[test]
    fn test_reconcile_value_emits_canonical_write_form() {
        let change = reconcile_value(
            TargetSide::Directory,
            &RecordKey::new("jdoe"),
            "mobile",
            Normalizer::Phone,
            Some("87 65 43 21"),
            "12 34 56 78",
        )
        .unwrap();
        assert_eq!(change.new, "12345678");
    }
}
