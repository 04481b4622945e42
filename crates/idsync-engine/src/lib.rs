//! # idsync-engine
//!
//! Reconciliation engine keeping identity attributes consistent between a
//! directory-style identity store and an HR record store.
//!
//! The engine decides, per field and per record pair, which side is
//! authoritative; decides which pairs are eligible at all through a
//! composable predicate chain (numeric ranges, allow/deny lists, group
//! membership); runs idempotently on a recurring schedule behind a
//! persisted watermark; and produces an auditable diff report.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ReconciliationRun                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────┐   ┌───────────────┐   ┌───────────────┐   │
//! │  │ Eligibility │──►│    Field      │──►│    Apply      │   │
//! │  │   Rules     │   │  Reconciler   │   │ (per side)    │   │
//! │  └─────────────┘   └───────────────┘   └───────┬───────┘   │
//! │         │                  │                   │           │
//! │         ▼                  ▼                   ▼           │
//! │  ┌─────────────┐   ┌───────────────┐   ┌───────────────┐   │
//! │  │  Watermark  │   │  DiffReport   │   │   Reporter    │   │
//! │  └─────────────┘   └───────────────┘   └───────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows strictly downward once per invocation; a run is a single
//! sequential pass with no internal concurrency. The host scheduler is
//! responsible for periodic invocation and for not overlapping runs of
//! the same job.
//!
//! ## Jobs
//!
//! Three callers share the same core ([`jobs`]): the two-store attribute
//! synchronization ([`jobs::HrSyncJob`]), the inactive-user cleanup
//! ([`jobs::InactiveUsersJob`]) and the one-directional registry
//! synchronization ([`jobs::RegistrySyncJob`]). Each keeps its own
//! watermark where it needs one.
//!
//! ## Example
//!
//! ```ignore
//! use idsync_engine::{HrSyncJob, SyncJobConfig};
//!
//! let config = SyncJobConfig::default(); // dry-run until switched on
//! let job = HrSyncJob::new(&directory, &hr, &xref, &watermarks, &reporter, config);
//! let result = job.run().await?;
//! println!("{}", result.summary());
//! ```

pub mod change;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod jobs;
pub mod mapping;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod run;
pub mod watermark;

pub use change::{ChangeRecord, TargetSide};
pub use config::{
    FilterConfig, InactiveAction, InactiveUsersConfig, MessageConfig, RegistrySyncConfig,
    SyncJobConfig,
};
pub use eligibility::EligibilityRules;
pub use error::{EngineError, SyncResult};
pub use jobs::{HrSyncJob, InactiveReport, InactiveUser, InactiveUsersJob, RegistrySyncJob};
pub use mapping::{
    default_field_table, mappings_from_directions, FieldKind, FieldMapping, SyncDirection,
};
pub use normalize::Normalizer;
pub use reconcile::{reconcile_value, FieldReconciler};
pub use report::{DiffReport, ErrorEntry, RunResult};
pub use run::{ApplyMode, ReconciliationRun, RunPhase};
pub use watermark::{watermark_floor, PgWatermarkStore, Watermark, WatermarkStore};
