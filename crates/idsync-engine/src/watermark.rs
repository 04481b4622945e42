//! Persisted watermark bounding incremental fetches.
//!
//! Each job keeps its own cursor: the inactive-user and HR synchronization
//! jobs never share a watermark even though they scan the same directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

use crate::error::SyncResult;

/// The lowest representable watermark, used when no cursor has been
/// persisted yet.
#[must_use]
pub fn watermark_floor() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

/// Monotonically non-decreasing cursor over record modification times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    value: DateTime<Utc>,
}

impl Watermark {
    /// Create a watermark at the given position.
    #[must_use]
    pub fn new(value: DateTime<Utc>) -> Self {
        Self { value }
    }

    /// Create a watermark from a persisted value, defaulting to the floor.
    #[must_use]
    pub fn from_persisted(value: Option<DateTime<Utc>>) -> Self {
        Self {
            value: value.unwrap_or_else(watermark_floor),
        }
    }

    /// Current position.
    #[must_use]
    pub fn value(&self) -> DateTime<Utc> {
        self.value
    }

    /// Advance to a candidate position. No-op when the candidate is not
    /// strictly greater, so the cursor never decreases.
    pub fn observe(&mut self, candidate: DateTime<Utc>) {
        if candidate > self.value {
            self.value = candidate;
        }
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            value: watermark_floor(),
        }
    }
}

/// Persistence of per-job watermarks across process restarts.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Load the watermark for a job. `Ok(None)` when none was persisted.
    async fn get(&self, job: &str) -> SyncResult<Option<DateTime<Utc>>>;

    /// Persist the watermark for a job.
    async fn set(&self, job: &str, value: DateTime<Utc>) -> SyncResult<()>;
}

/// Postgres-backed watermark store, one row per job name.
#[derive(Debug, Clone)]
pub struct PgWatermarkStore {
    pool: PgPool,
}

impl PgWatermarkStore {
    /// Create a new store on the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    #[instrument(skip(self))]
    async fn get(&self, job: &str) -> SyncResult<Option<DateTime<Utc>>> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r"
            SELECT watermark
            FROM sync_watermarks
            WHERE job_name = $1
            ",
        )
        .bind(job)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(value,)| value))
    }

    #[instrument(skip(self))]
    async fn set(&self, job: &str, value: DateTime<Utc>) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO sync_watermarks (job_name, watermark, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (job_name) DO UPDATE SET
                watermark = EXCLUDED.watermark,
                updated_at = NOW()
            ",
        )
        .bind(job)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_default_is_floor() {
        assert_eq!(Watermark::default().value(), watermark_floor());
        assert_eq!(Watermark::from_persisted(None).value(), watermark_floor());
    }

    #[test]
    fn test_observe_advances_monotonically() {
        let mut watermark = Watermark::from_persisted(Some(at(8)));

        watermark.observe(at(10));
        assert_eq!(watermark.value(), at(10));

        // Older candidates never move the cursor back.
        watermark.observe(at(9));
        assert_eq!(watermark.value(), at(10));

        // Equal candidates are a no-op too.
        watermark.observe(at(10));
        assert_eq!(watermark.value(), at(10));
    }

    #[test]
    fn test_from_persisted_value() {
        let watermark = Watermark::from_persisted(Some(at(12)));
        assert_eq!(watermark.value(), at(12));
    }
}
