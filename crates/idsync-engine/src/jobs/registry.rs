//! The registry synchronization job.
//!
//! One-directional: the national civil registry is always authoritative
//! for the four name fields, and either store (or both) is brought in
//! line. Shares the eligibility rules and the value-reconciliation
//! primitive with the pairwise job; keeps its own watermark.

use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use idsync_store::{
    fields, AttributeValue, DirectoryStore, HrStore, Record, RegistryLookup, RegistryPerson,
    ReportEnvelope, Reporter,
};

use crate::change::{ChangeRecord, TargetSide};
use crate::config::RegistrySyncConfig;
use crate::eligibility::EligibilityRules;
use crate::error::{EngineError, SyncResult};
use crate::jobs::notify_failure;
use crate::normalize::Normalizer;
use crate::reconcile::reconcile_value;
use crate::report::{DiffReport, RunResult};
use crate::watermark::{Watermark, WatermarkStore};

/// A name field on one store, with the registry's desired value.
struct NameField {
    field: &'static str,
    attribute: &'static str,
    desired: String,
}

/// Synchronizes name fields from the national registry into the stores.
pub struct RegistrySyncJob<'a, D, H, G, W, R>
where
    D: DirectoryStore,
    H: HrStore,
    G: RegistryLookup,
    W: WatermarkStore,
    R: Reporter,
{
    directory: &'a D,
    hr: &'a H,
    registry: &'a G,
    watermarks: &'a W,
    reporter: &'a R,
    config: RegistrySyncConfig,
}

impl<'a, D, H, G, W, R> RegistrySyncJob<'a, D, H, G, W, R>
where
    D: DirectoryStore,
    H: HrStore,
    G: RegistryLookup,
    W: WatermarkStore,
    R: Reporter,
{
    /// Create the job.
    pub fn new(
        directory: &'a D,
        hr: &'a H,
        registry: &'a G,
        watermarks: &'a W,
        reporter: &'a R,
        config: RegistrySyncConfig,
    ) -> Self {
        Self {
            directory,
            hr,
            registry,
            watermarks,
            reporter,
            config,
        }
    }

    /// Execute one pass and deliver the report.
    pub async fn run(&self) -> SyncResult<RunResult> {
        let result = match self.execute().await {
            Ok(result) => result,
            Err(err) => {
                error!(job = %self.config.job_name, error = %err, "Registry run failed");
                notify_failure(self.reporter, &self.config.message.subject, &err).await;
                return Err(err);
            }
        };

        if self.config.message.send {
            self.reporter
                .deliver(&ReportEnvelope::new(
                    self.config.message.to.clone(),
                    self.config.message.subject.clone(),
                    result.summary(),
                ))
                .await?;
        }

        Ok(result)
    }

    async fn execute(&self) -> SyncResult<RunResult> {
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            job = %self.config.job_name,
            sync_directory = self.config.sync_directory,
            sync_hr = self.config.sync_hr,
            "Starting registry synchronization"
        );

        let rules = EligibilityRules::resolve(&self.config.filter, self.directory).await?;
        let mut watermark =
            Watermark::from_persisted(self.watermarks.get(&self.config.job_name).await?);
        let since = watermark.value();
        let mut report = DiffReport::new();

        if self.config.sync_directory {
            let records = self
                .directory
                .fetch_modified_since(since)
                .await
                .map_err(|e| EngineError::fetch("directory", e))?;
            for record in records {
                watermark.observe(record.modified_at);
                self.sync_record(TargetSide::Directory, &record, &rules, &mut report)
                    .await;
            }
        }

        if self.config.sync_hr {
            let records = self
                .hr
                .fetch_modified_since(since, self.config.hr_active_only)
                .await
                .map_err(|e| EngineError::fetch("hr store", e))?;
            for record in records {
                watermark.observe(record.modified_at);
                self.sync_record(TargetSide::HrStore, &record, &rules, &mut report)
                    .await;
            }
        }

        self.watermarks
            .set(&self.config.job_name, watermark.value())
            .await?;

        let result = RunResult::from_report(run_id, report, watermark.value());
        info!(
            run_id = %run_id,
            changes = result.changes.len(),
            errors = result.errors.len(),
            "Registry synchronization finished"
        );
        Ok(result)
    }

    /// Process one record of one store: look the person up and stage the
    /// differing name fields. Lookup and save failures are per-record.
    async fn sync_record(
        &self,
        side: TargetSide,
        record: &Record,
        rules: &EligibilityRules,
        report: &mut DiffReport,
    ) {
        let Some(national_id) = record
            .get_str(fields::NATIONAL_ID)
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            return;
        };

        if side == TargetSide::Directory
            && self.config.directory_enabled_only
            && record.get(fields::ENABLED).and_then(AttributeValue::as_boolean) == Some(false)
        {
            return;
        }

        if !rules.is_eligible(record) {
            return;
        }
        report.mark_eligible();

        let person = match self.registry.lookup(national_id).await {
            Ok(Some(person)) => person,
            Ok(None) => {
                debug!(key = %record.key, "National id unknown to the registry");
                return;
            }
            Err(err) => {
                report.record_error(record.key.clone(), err.to_string());
                return;
            }
        };

        let staged: Vec<(&'static str, ChangeRecord)> = self
            .name_fields(side, &person)
            .into_iter()
            .filter_map(|nf| {
                reconcile_value(
                    side,
                    &record.key,
                    nf.field,
                    Normalizer::Text,
                    record.get_str(nf.attribute),
                    &nf.desired,
                )
                .map(|change| (nf.attribute, change))
            })
            .collect();

        if staged.is_empty() {
            return;
        }

        for (_, change) in &staged {
            report.record_change(change.clone());
        }

        if self.config.fail_always {
            return;
        }

        let mut updated = record.clone();
        for (attribute, change) in &staged {
            updated.set((*attribute).to_string(), change.new.clone());
        }

        let save_result = match side {
            TargetSide::Directory => {
                let field_names: Vec<&str> =
                    staged.iter().map(|(_, c)| c.field.as_str()).collect();
                updated.prepend_note(
                    Utc::now(),
                    &format!("{}: {}", self.config.info_text, field_names.join(", ")),
                );
                self.directory.save(&updated).await
            }
            TargetSide::HrStore => self.hr.save(&updated, true).await,
        };

        if let Err(err) = save_result {
            report.record_error(record.key.clone(), err.to_string());
        } else {
            debug!(key = %record.key, side = %side, fields = staged.len(), "Updated record from registry");
        }
    }

    fn name_fields(&self, side: TargetSide, person: &RegistryPerson) -> Vec<NameField> {
        let (given, surname, full, display) = match side {
            TargetSide::Directory => ("givenName", "sn", "cn", "displayName"),
            TargetSide::HrStore => ("first_name", "last_name", "full_name", "display_name"),
        };

        let mut table = Vec::new();
        if self.config.sync_given_name {
            table.push(NameField {
                field: "givenName",
                attribute: given,
                desired: person.given_name(),
            });
        }
        if self.config.sync_surname {
            table.push(NameField {
                field: "surname",
                attribute: surname,
                desired: person.last_name.clone(),
            });
        }
        if self.config.sync_full_name {
            table.push(NameField {
                field: "fullName",
                attribute: full,
                desired: person.full_name.clone(),
            });
        }
        if self.config.sync_display_name {
            table.push(NameField {
                field: "displayName",
                attribute: display,
                desired: person.full_name.clone(),
            });
        }
        table
    }
}
