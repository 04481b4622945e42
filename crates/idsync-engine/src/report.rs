//! Run report accumulation.
//!
//! The diff report is a pure data holder: changes and per-record errors are
//! appended during the run and handed to the reporting collaborator once
//! the run completes. Grouping and counting happen on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use idsync_store::RecordKey;

use crate::change::{ChangeRecord, TargetSide};

/// A per-record error captured during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Key of the affected record.
    pub key: RecordKey,
    /// Underlying error message.
    pub message: String,
}

impl ErrorEntry {
    /// Create a new error entry.
    pub fn new(key: RecordKey, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Append-only accumulator of changes and errors for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffReport {
    changes: Vec<ChangeRecord>,
    errors: Vec<ErrorEntry>,
    eligible_pairs: u32,
}

impl DiffReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change.
    pub fn record_change(&mut self, change: ChangeRecord) {
        self.changes.push(change);
    }

    /// Append a per-record error.
    pub fn record_error(&mut self, key: RecordKey, message: impl Into<String>) {
        self.errors.push(ErrorEntry::new(key, message));
    }

    /// Count one eligible pair.
    pub fn mark_eligible(&mut self) {
        self.eligible_pairs += 1;
    }

    /// All changes, in insertion order.
    #[must_use]
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    /// Changes targeting one side.
    pub fn changes_for(&self, side: TargetSide) -> impl Iterator<Item = &ChangeRecord> {
        self.changes.iter().filter(move |c| c.side == side)
    }

    /// Number of changes targeting one side.
    #[must_use]
    pub fn count_for(&self, side: TargetSide) -> usize {
        self.changes_for(side).count()
    }

    /// All per-record errors, in insertion order.
    #[must_use]
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Eligible pairs examined so far.
    #[must_use]
    pub fn eligible_pairs(&self) -> u32 {
        self.eligible_pairs
    }

    /// Check whether the report carries neither changes nor errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.errors.is_empty()
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Run identifier.
    pub run_id: Uuid,
    /// Staged (and, in apply mode, committed) changes.
    pub changes: Vec<ChangeRecord>,
    /// Per-record errors.
    pub errors: Vec<ErrorEntry>,
    /// Eligible pairs examined.
    pub eligible_pairs: u32,
    /// The watermark value committed by this run.
    pub watermark: DateTime<Utc>,
}

impl RunResult {
    /// Assemble a result from a finished report.
    #[must_use]
    pub fn from_report(run_id: Uuid, report: DiffReport, watermark: DateTime<Utc>) -> Self {
        Self {
            run_id,
            changes: report.changes,
            errors: report.errors,
            eligible_pairs: report.eligible_pairs,
            watermark,
        }
    }

    /// Number of changes targeting one side.
    #[must_use]
    pub fn count_for(&self, side: TargetSide) -> usize {
        self.changes.iter().filter(|c| c.side == side).count()
    }

    /// Check whether the run changed anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Plain-text summary handed to the reporting collaborator.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut body = String::new();
        body.push_str(&format!(
            "{} directory changes, {} HR changes, {} eligible pairs examined\n",
            self.count_for(TargetSide::Directory),
            self.count_for(TargetSide::HrStore),
            self.eligible_pairs,
        ));

        for change in &self.changes {
            body.push_str(&format!("{} {} {}\n", change.side, change.key, change));
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
