use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{points, points::NewPoint, versions, versions::VersionStatus};

/// One grid point-month as sent by the importer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchRow {
    pub lat: f64,
    pub lon: f64,
    pub month: i64,
    pub ghi: f64,
    pub dhi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCommand {
    pub version_id: Uuid,
    pub rows: Vec<BatchRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub inserted: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Row {index}: {reason}")]
    InvalidRow { index: usize, reason: String },
    #[error("Batch of {0} rows exceeds the limit of {1}")]
    TooLarge(usize, usize),
    #[error("Version '{0}' not found")]
    VersionNotFound(Uuid),
    #[error("Version '{0}' is {1}, only processing versions accept rows")]
    NotProcessing(Uuid, VersionStatus),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BatchRow {
    fn to_point(self, index: usize) -> Result<NewPoint, BatchError> {
        let invalid = |reason: String| BatchError::InvalidRow { index, reason };

        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(invalid(format!("latitude {} out of range [-90, 90]", self.lat)));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(invalid(format!("longitude {} out of range [-180, 180]", self.lon)));
        }
        let month = i16::try_from(self.month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| invalid(format!("month {} out of range 1-12", self.month)))?;
        if !self.ghi.is_finite() || self.ghi < 0.0 {
            return Err(invalid(format!("ghi {} must be a non-negative number", self.ghi)));
        }
        if !self.dhi.is_finite() || self.dhi < 0.0 {
            return Err(invalid(format!("dhi {} must be a non-negative number", self.dhi)));
        }

        Ok(NewPoint {
            lat: self.lat,
            lon: self.lon,
            month,
            ghi: self.ghi,
            dhi: self.dhi,
        })
    }
}

impl BatchCommand {
    /// Check the size limit and every row, yielding the points to insert.
    pub fn validate(&self, max_rows: usize) -> Result<Vec<NewPoint>, BatchError> {
        if self.rows.len() > max_rows {
            return Err(BatchError::TooLarge(self.rows.len(), max_rows));
        }
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| row.to_point(index))
            .collect()
    }
}

/// Append rows to a `processing` version.
///
/// Batches are not deduplicated against each other. The version row is held
/// `FOR SHARE` so a finalize or abort cannot slip in mid-batch.
#[tracing::instrument(skip(pool, command), fields(version_id = %command.version_id, rows = command.rows.len()))]
pub async fn handle(
    pool: PgPool,
    command: BatchCommand,
    max_rows: usize,
) -> Result<BatchResponse, BatchError> {
    let points = command.validate(max_rows)?;
    if points.is_empty() {
        return Ok(BatchResponse { inserted: 0 });
    }

    let mut tx = pool.begin().await?;

    let version = versions::lock_for_share(&mut *tx, command.version_id)
        .await?
        .ok_or(BatchError::VersionNotFound(command.version_id))?;

    if version.status != VersionStatus::Processing {
        return Err(BatchError::NotProcessing(version.id, version.status));
    }

    let inserted = points::insert_batch(&mut *tx, version.id, &points).await?;
    tx.commit().await?;

    if let Err(e) = versions::touch_processing(&pool, version.id).await {
        tracing::warn!(error = %e, "Failed to refresh version heartbeat");
    }

    tracing::debug!(inserted, "Batch stored");

    Ok(BatchResponse { inserted })
}
