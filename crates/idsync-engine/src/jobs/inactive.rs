//! The inactive-users cleanup job.
//!
//! A directory-only workflow: users who have not logged on within the
//! configured window, and who pass the shared eligibility rules, are
//! disabled or deleted. The scan is absolute, not incremental, so this job
//! keeps no watermark.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use idsync_store::{fields, DirectoryStore, Record, RecordKey, ReportEnvelope, Reporter};

use crate::config::{InactiveAction, InactiveUsersConfig};
use crate::eligibility::EligibilityRules;
use crate::error::{EngineError, SyncResult};
use crate::jobs::notify_failure;
use crate::report::ErrorEntry;
use crate::watermark::watermark_floor;

/// One user the job found inactive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactiveUser {
    /// Account key.
    pub key: RecordKey,
    /// Display name, empty when the directory has none.
    pub name: String,
    /// Mail address, empty when the directory has none.
    pub email: String,
    /// Last interactive logon.
    pub last_logon: DateTime<Utc>,
}

/// Outcome of one inactive-users pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactiveReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// The action this run was configured to take.
    pub action: InactiveAction,
    /// Whether the action was actually performed.
    pub applied: bool,
    /// Users found inactive and eligible.
    pub users: Vec<InactiveUser>,
    /// Per-user errors.
    pub errors: Vec<ErrorEntry>,
}

impl InactiveReport {
    /// Plain-text summary handed to the reporting collaborator.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut body = format!(
            "{} inactive users, action {} ({})\n",
            self.users.len(),
            self.action,
            if self.applied { "performed" } else { "not performed" },
        );

        for user in &self.users {
            body.push_str(&format!(
                "{} {} {} {}\n",
                user.key,
                user.name,
                user.email,
                user.last_logon.format("%Y-%m-%d"),
            ));
        }

        if !self.errors.is_empty() {
            body.push_str("\nErrors:\n");
            for error in &self.errors {
                body.push_str(&format!("{error}\n"));
            }
        }

        body
    }
}

/// Finds and disables or deletes inactive directory accounts.
pub struct InactiveUsersJob<'a, D, R>
where
    D: DirectoryStore,
    R: Reporter,
{
    directory: &'a D,
    reporter: &'a R,
    config: InactiveUsersConfig,
}

impl<'a, D, R> InactiveUsersJob<'a, D, R>
where
    D: DirectoryStore,
    R: Reporter,
{
    /// Create the job.
    pub fn new(directory: &'a D, reporter: &'a R, config: InactiveUsersConfig) -> Self {
        Self {
            directory,
            reporter,
            config,
        }
    }

    /// Execute one pass and deliver the report.
    pub async fn run(&self) -> SyncResult<InactiveReport> {
        let report = match self.execute().await {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "Inactive-users run failed");
                notify_failure(self.reporter, &self.config.message.subject, &err).await;
                return Err(err);
            }
        };

        if self.config.message.send {
            self.reporter
                .deliver(&ReportEnvelope::new(
                    self.config.message.to.clone(),
                    self.config.message.subject.clone(),
                    report.summary(),
                ))
                .await?;
        }

        Ok(report)
    }

    async fn execute(&self) -> SyncResult<InactiveReport> {
        let run_id = Uuid::new_v4();
        let rules = EligibilityRules::resolve(&self.config.filter, self.directory).await?;

        let users = self
            .directory
            .fetch_modified_since(watermark_floor())
            .await
            .map_err(|e| EngineError::fetch("directory", e))?;

        let days = self.config.effective_inactive_days();
        let cutoff = Utc::now() - Duration::days(days);
        info!(days, cutoff = %cutoff, "Scanning for inactive users");

        let mut hits = Vec::new();
        let mut records = Vec::new();
        for user in users {
            let Some(last_logon) = user
                .get(fields::LAST_LOGON)
                .and_then(idsync_store::AttributeValue::as_timestamp)
            else {
                continue;
            };
            if last_logon >= cutoff || !rules.is_eligible(&user) {
                continue;
            }

            info!(key = %user.key, last_logon = %last_logon, "Inactive user");
            hits.push(InactiveUser {
                key: user.key.clone(),
                name: user.get_str("displayName").unwrap_or_default().to_string(),
                email: user.get_str("mail").unwrap_or_default().to_string(),
                last_logon,
            });
            records.push(user);
        }

        let applied = !self.config.fail_always && self.config.action != InactiveAction::Report;
        let mut errors = Vec::new();

        if applied {
            let now = Utc::now();
            for record in &records {
                self.process(record, now, &mut errors).await;
            }
        } else {
            info!(
                users = hits.len(),
                "No action taken; the run is gated off or report-only"
            );
        }

        Ok(InactiveReport {
            run_id,
            action: self.config.action,
            applied,
            users: hits,
            errors,
        })
    }

    async fn process(&self, record: &Record, now: DateTime<Utc>, errors: &mut Vec<ErrorEntry>) {
        // Disabled first in both modes: a user that cannot be deleted
        // must at least end up disabled.
        if let Err(err) = self.disable(record, now).await {
            errors.push(ErrorEntry::new(
                record.key.clone(),
                format!("unable to disable: {err}"),
            ));
        }

        if self.config.action == InactiveAction::Delete {
            if let Err(err) = self.directory.delete(&record.key).await {
                errors.push(ErrorEntry::new(
                    record.key.clone(),
                    format!("unable to delete: {err}"),
                ));
            }
        }
    }

    async fn disable(
        &self,
        record: &Record,
        now: DateTime<Utc>,
    ) -> Result<(), idsync_store::StoreError> {
        let mut updated = record.clone();
        updated.set(fields::ENABLED, false);
        updated.prepend_note(now, &self.config.info_text);
        self.directory.save(&updated).await
    }
}
