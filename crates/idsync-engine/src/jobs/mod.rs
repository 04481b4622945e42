//! Concrete jobs built on the reconciliation core.
//!
//! Three callers share the eligibility and field-reconciliation
//! primitives: the two-store attribute synchronization, the inactive-user
//! cleanup and the one-directional registry synchronization.

use tracing::warn;

use idsync_store::Reporter;

use crate::error::EngineError;

pub mod hr;
pub mod inactive;
pub mod registry;

pub use hr::HrSyncJob;
pub use inactive::{InactiveReport, InactiveUser, InactiveUsersJob};
pub use registry::RegistrySyncJob;

/// Best-effort error notification before re-raising a run failure.
pub(crate) async fn notify_failure<R: Reporter + ?Sized>(
    reporter: &R,
    subject: &str,
    error: &EngineError,
) {
    let subject = format!("Error {subject}");
    if let Err(delivery_error) = reporter.deliver_error(&subject, &error.to_string()).await {
        warn!(error = %delivery_error, "Unable to deliver error notification");
    }
}
