//! The directory/HR attribute synchronization job.

use tracing::error;

use idsync_store::{CrossReference, DirectoryStore, HrStore, ReportEnvelope, Reporter};

use crate::config::SyncJobConfig;
use crate::error::SyncResult;
use crate::jobs::notify_failure;
use crate::report::RunResult;
use crate::run::ReconciliationRun;
use crate::watermark::WatermarkStore;

/// Keeps mapped attributes consistent between the directory and the HR
/// store, both directions, on a recurring schedule driven by the host.
///
/// An unexpected failure triggers a best-effort error notification and is
/// then re-raised so the external scheduler sees the run fail.
pub struct HrSyncJob<'a, D, H, X, W, R>
where
    D: DirectoryStore,
    H: HrStore,
    X: CrossReference,
    W: WatermarkStore,
    R: Reporter,
{
    directory: &'a D,
    hr: &'a H,
    xref: &'a X,
    watermarks: &'a W,
    reporter: &'a R,
    config: SyncJobConfig,
}

impl<'a, D, H, X, W, R> HrSyncJob<'a, D, H, X, W, R>
where
    D: DirectoryStore,
    H: HrStore,
    X: CrossReference,
    W: WatermarkStore,
    R: Reporter,
{
    /// Create the job.
    pub fn new(
        directory: &'a D,
        hr: &'a H,
        xref: &'a X,
        watermarks: &'a W,
        reporter: &'a R,
        config: SyncJobConfig,
    ) -> Self {
        Self {
            directory,
            hr,
            xref,
            watermarks,
            reporter,
            config,
        }
    }

    /// Execute one synchronization pass and deliver the report.
    pub async fn run(&self) -> SyncResult<RunResult> {
        let result = match self.execute().await {
            Ok(result) => result,
            Err(err) => {
                error!(job = %self.config.job_name, error = %err, "Synchronization run failed");
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
        let mut run = ReconciliationRun::new(
            self.directory,
            self.hr,
            self.xref,
            self.watermarks,
            &self.config,
        )?;
        run.execute().await
    }
}
