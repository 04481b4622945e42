//! Reconciliation run orchestration.
//!
//! One run moves through `Idle -> Fetching -> Filtering -> Reconciling ->
//! Applying -> Reporting -> Done`. A failure while fetching (stores or
//! group resolution) is fatal and leaves the watermark untouched; from
//! filtering onward failures are per record pair and the run always
//! reaches the end. The apply-mode gate is fixed for the whole run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use idsync_store::{CrossReference, DirectoryStore, HrStore, Record};

use crate::change::{ChangeRecord, TargetSide};
use crate::config::SyncJobConfig;
use crate::eligibility::EligibilityRules;
use crate::error::{EngineError, SyncResult};
use crate::mapping::{mappings_from_directions, FieldMapping};
use crate::reconcile::FieldReconciler;
use crate::report::{DiffReport, RunResult};
use crate::watermark::{Watermark, WatermarkStore};

/// Phase of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started.
    Idle,
    /// Loading the watermark, both stores and the group rules.
    Fetching,
    /// Pairing records and evaluating eligibility.
    Filtering,
    /// Running the field reconciler over eligible pairs.
    Reconciling,
    /// Committing staged mutations to the owning stores.
    Applying,
    /// Committing the watermark and assembling the result.
    Reporting,
    /// Finished.
    Done,
    /// Aborted during fetching.
    Failed,
}

impl RunPhase {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Filtering => "filtering",
            RunPhase::Reconciling => "reconciling",
            RunPhase::Applying => "applying",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }

    /// Check if this is a terminal phase.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run-wide mutation gate, fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Commit staged changes to the owning stores.
    Apply,
    /// Stage and report changes, issue no store mutation.
    DryRun,
}

impl ApplyMode {
    /// Derive the mode from the `fail_always` configuration gate.
    #[must_use]
    pub fn from_fail_always(fail_always: bool) -> Self {
        if fail_always {
            ApplyMode::DryRun
        } else {
            ApplyMode::Apply
        }
    }

    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyMode::Apply => "apply",
            ApplyMode::DryRun => "dry_run",
        }
    }

    /// Check if mutations are suppressed.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ApplyMode::DryRun)
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An eligible pair with its staged changes.
struct StagedPair {
    directory: Record,
    hr: Record,
    changes: Vec<ChangeRecord>,
}

/// Orchestrates one reconciliation pass over the two stores.
pub struct ReconciliationRun<'a, D, H, X, W>
where
    D: DirectoryStore,
    H: HrStore,
    X: CrossReference,
    W: WatermarkStore,
{
    run_id: Uuid,
    directory: &'a D,
    hr: &'a H,
    xref: &'a X,
    watermarks: &'a W,
    config: &'a SyncJobConfig,
    mappings: Vec<FieldMapping>,
    mode: ApplyMode,
    phase: RunPhase,
}

impl<'a, D, H, X, W> ReconciliationRun<'a, D, H, X, W>
where
    D: DirectoryStore,
    H: HrStore,
    X: CrossReference,
    W: WatermarkStore,
{
    /// Create a run from configuration. The field table is the default
    /// one with per-field directions applied.
    pub fn new(
        directory: &'a D,
        hr: &'a H,
        xref: &'a X,
        watermarks: &'a W,
        config: &'a SyncJobConfig,
    ) -> SyncResult<Self> {
        let mappings = mappings_from_directions(&config.directions)?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            directory,
            hr,
            xref,
            watermarks,
            config,
            mappings,
            mode: ApplyMode::from_fail_always(config.fail_always),
            phase: RunPhase::Idle,
        })
    }

    /// Replace the field table.
    #[must_use]
    pub fn with_mappings(mut self, mappings: Vec<FieldMapping>) -> Self {
        self.mappings = mappings;
        self
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The run-wide apply-mode gate.
    #[must_use]
    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    /// Execute the run to completion.
    pub async fn execute(&mut self) -> SyncResult<RunResult> {
        info!(
            run_id = %self.run_id,
            job = %self.config.job_name,
            mode = %self.mode,
            "Starting reconciliation run"
        );

        self.phase = RunPhase::Fetching;
        let (mut watermark, rules, dir_records, hr_records) = match self.fetch().await {
            Ok(fetched) => fetched,
            Err(error) => {
                self.phase = RunPhase::Failed;
                return Err(error);
            }
        };

        // Every fetched record moves the candidate watermark, changed or
        // not, so unchanged-but-scanned records are never re-scanned.
        for record in dir_records.iter().chain(hr_records.iter()) {
            watermark.observe(record.modified_at);
        }

        self.phase = RunPhase::Filtering;
        let mut report = DiffReport::new();
        let pairs = self
            .pair_up(dir_records, hr_records, &rules, &mut report)
            .await;

        self.phase = RunPhase::Reconciling;
        let staged = self.reconcile_pairs(pairs, &mut report).await;

        self.phase = RunPhase::Applying;
        self.apply(staged, &mut report).await;

        self.phase = RunPhase::Reporting;
        self.watermarks
            .set(&self.config.job_name, watermark.value())
            .await?;

        let result = RunResult::from_report(self.run_id, report, watermark.value());
        info!(
            run_id = %self.run_id,
            changes = result.changes.len(),
            errors = result.errors.len(),
            eligible_pairs = result.eligible_pairs,
            watermark = %result.watermark,
            "Reconciliation run finished"
        );
        self.phase = RunPhase::Done;
        Ok(result)
    }

    /// The fetch phase: watermark, both bulk fetches and group resolution.
    /// Any failure here is fatal for the run.
    async fn fetch(
        &self,
    ) -> SyncResult<(Watermark, EligibilityRules, Vec<Record>, Vec<Record>)> {
        let watermark =
            Watermark::from_persisted(self.watermarks.get(&self.config.job_name).await?);

        let dir_records = self
            .directory
            .fetch_modified_since(watermark.value())
            .await
            .map_err(|e| EngineError::fetch("directory", e))?;

        let hr_records = self
            .hr
            .fetch_modified_since(watermark.value(), self.config.active_only)
            .await
            .map_err(|e| EngineError::fetch("hr store", e))?;

        let rules = EligibilityRules::resolve(&self.config.filter, self.directory).await?;

        debug!(
            directory_records = dir_records.len(),
            hr_records = hr_records.len(),
            since = %watermark.value(),
            "Fetched modified records"
        );

        Ok((watermark, rules, dir_records, hr_records))
    }

    /// Pair fetched records by their shared key and evaluate eligibility.
    /// Each key is considered at most once per run.
    async fn pair_up(
        &self,
        dir_records: Vec<Record>,
        hr_records: Vec<Record>,
        rules: &EligibilityRules,
        report: &mut DiffReport,
    ) -> Vec<(Record, Record)> {
        let mut dir_index: HashMap<String, usize> = HashMap::new();
        for (i, record) in dir_records.iter().enumerate() {
            dir_index.insert(record.key.as_str().to_lowercase(), i);
        }
        let mut dir_slots: Vec<Option<Record>> = dir_records.into_iter().map(Some).collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut pairs = Vec::new();

        // HR-changed records drive the first pass, point-fetching their
        // directory partner when it was not itself modified.
        for hr_record in hr_records {
            let key_lower = hr_record.key.as_str().to_lowercase();
            if !seen.insert(key_lower.clone()) {
                continue;
            }

            let dir_record = match dir_index.get(&key_lower) {
                Some(&i) => dir_slots[i].take(),
                None => match self.directory.fetch_by_key(&hr_record.key).await {
                    Ok(found) => found,
                    Err(error) => {
                        report.record_error(hr_record.key.clone(), error.to_string());
                        continue;
                    }
                },
            };

            let Some(dir_record) = dir_record else {
                info!(key = %hr_record.key, "User not found in directory, skipping");
                continue;
            };

            if rules.is_eligible_pair(&dir_record, &hr_record) {
                report.mark_eligible();
                pairs.push((dir_record, hr_record));
            }
        }

        // Directory-changed records with no HR-side change left.
        for slot in dir_slots {
            let Some(dir_record) = slot else { continue };
            let key_lower = dir_record.key.as_str().to_lowercase();
            if !seen.insert(key_lower) {
                continue;
            }

            let hr_record = match self.xref.hr_record_for_directory_key(&dir_record.key).await {
                Ok(Some(found)) => found,
                Ok(None) => {
                    debug!(key = %dir_record.key, "No HR record, skipping");
                    continue;
                }
                Err(error) => {
                    report.record_error(dir_record.key.clone(), error.to_string());
                    continue;
                }
            };

            if rules.is_eligible_pair(&dir_record, &hr_record) {
                report.mark_eligible();
                pairs.push((dir_record, hr_record));
            }
        }

        pairs
    }

    /// Run the field reconciler over every pair, staging changes. A
    /// failing pair is recorded and skipped; the run continues.
    async fn reconcile_pairs(
        &self,
        pairs: Vec<(Record, Record)>,
        report: &mut DiffReport,
    ) -> Vec<StagedPair> {
        let reconciler = FieldReconciler::new(self.xref);
        let mut staged = Vec::new();

        'pairs: for (directory, hr) in pairs {
            let mut changes = Vec::new();
            for mapping in &self.mappings {
                match reconciler.reconcile(&directory, &hr, mapping).await {
                    Ok(Some(change)) => changes.push(change),
                    Ok(None) => {}
                    Err(error) => {
                        report.record_error(
                            directory.key.clone(),
                            format!("field '{}': {error}", mapping.field),
                        );
                        continue 'pairs;
                    }
                }
            }

            if changes.is_empty() {
                continue;
            }

            debug!(
                key = %directory.key,
                changes = changes.len(),
                "Staged field changes"
            );
            for change in &changes {
                report.record_change(change.clone());
            }
            staged.push(StagedPair {
                directory,
                hr,
                changes,
            });
        }

        staged
    }

    /// Commit staged changes, one save per side per record. In dry-run
    /// mode nothing is written.
    async fn apply(&self, staged: Vec<StagedPair>, report: &mut DiffReport) {
        if self.mode.is_dry_run() {
            if !staged.is_empty() {
                info!(
                    pairs = staged.len(),
                    "Dry run, staged changes were not written"
                );
            }
            return;
        }

        let now = Utc::now();
        for pair in staged {
            let hr_fields: Vec<&ChangeRecord> = pair
                .changes
                .iter()
                .filter(|c| c.side == TargetSide::HrStore)
                .collect();
            if !hr_fields.is_empty() {
                let mut record = pair.hr.clone();
                self.apply_changes(&mut record, TargetSide::HrStore, &hr_fields);
                if let Err(error) = self.hr.save(&record, true).await {
                    report.record_error(record.key.clone(), error.to_string());
                } else {
                    debug!(key = %record.key, fields = hr_fields.len(), "Updated HR record");
                }
            }

            let dir_fields: Vec<&ChangeRecord> = pair
                .changes
                .iter()
                .filter(|c| c.side == TargetSide::Directory)
                .collect();
            if !dir_fields.is_empty() {
                let mut record = pair.directory.clone();
                self.apply_changes(&mut record, TargetSide::Directory, &dir_fields);

                let field_names: Vec<&str> =
                    dir_fields.iter().map(|c| c.field.as_str()).collect();
                record.prepend_note(
                    now,
                    &format!("{}: {}", self.config.info_text, field_names.join(", ")),
                );

                if let Err(error) = self.directory.save(&record).await {
                    report.record_error(record.key.clone(), error.to_string());
                } else {
                    debug!(key = %record.key, fields = dir_fields.len(), "Updated directory record");
                }
            }
        }
    }

    fn apply_changes(&self, record: &mut Record, side: TargetSide, changes: &[&ChangeRecord]) {
        for change in changes {
            match self.attribute_for(side, &change.field) {
                Some(attribute) => record.set(attribute.to_string(), change.new.clone()),
                None => {
                    warn!(field = %change.field, "No mapping for staged change, skipping attribute");
                }
            }
        }
    }

    fn attribute_for(&self, side: TargetSide, field: &str) -> Option<&str> {
        self.mappings.iter().find(|m| m.field == field).map(|m| match side {
            TargetSide::Directory => m.directory_attribute.as_str(),
            TargetSide::HrStore => m.hr_attribute.as_str(),
        })
    }
}
