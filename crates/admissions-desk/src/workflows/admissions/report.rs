use sqlx::Row;
use tracing::warn;

use super::domain::{Stage, StageSummary};
use super::query;
use super::store::{Database, StoreError};

/// Counts enquiries per pipeline stage.
#[derive(Debug, Clone)]
pub struct StageReporter {
    database: Database,
}

impl StageReporter {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Every stage is present in the result, zero when no enquiry sits there.
    pub async fn summarize(&self, class_applied: Option<&str>) -> Result<StageSummary, StoreError> {
        let rows = self
            .database
            .fetch_rows(&query::stage_counts(class_applied))
            .await?;

        let mut summary = StageSummary::empty();
        for row in rows {
            let stage: String = row.try_get("stage")?;
            let count: i64 = row.try_get("count")?;
            match stage.parse::<Stage>() {
                Ok(stage) => {
                    summary.by_stage.insert(stage, count);
                    summary.total += count;
                }
                Err(_) => warn!(%stage, count, "skipping enquiries with unrecognized stage"),
            }
        }

        Ok(summary)
    }
}
