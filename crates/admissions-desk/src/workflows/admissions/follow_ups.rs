use tracing::info;

use super::domain::{EnquiryId, FollowUp, FollowUpId, NewFollowUp};
use super::query;
use super::store::{follow_up_from_row, Database, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum FollowUpRepositoryError {
    #[error("enquiry {0} not found")]
    EnquiryNotFound(EnquiryId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Append-only follow-up timeline per enquiry.
#[derive(Debug, Clone)]
pub struct FollowUpRepository {
    database: Database,
}

impl FollowUpRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Insert in one statement that only writes when the enquiry exists.
    pub async fn create(
        &self,
        enquiry_id: EnquiryId,
        follow_up: &NewFollowUp,
    ) -> Result<FollowUpId, FollowUpRepositoryError> {
        let inserted = self
            .database
            .insert_returning_id(&query::insert_follow_up(enquiry_id, follow_up))
            .await;

        let id = match inserted {
            Ok(Some(id)) => FollowUpId(id),
            Ok(None) => return Err(FollowUpRepositoryError::EnquiryNotFound(enquiry_id)),
            Err(err) if err.is_foreign_key_violation() => {
                return Err(FollowUpRepositoryError::EnquiryNotFound(enquiry_id))
            }
            Err(err) => return Err(err.into()),
        };

        info!(enquiry_id = %enquiry_id, follow_up_id = id.0, due_on = %follow_up.due_on, "follow-up logged");
        Ok(id)
    }

    /// Earliest due date first; same-day entries most recently logged first.
    pub async fn list_by_enquiry(
        &self,
        enquiry_id: EnquiryId,
    ) -> Result<Vec<FollowUp>, FollowUpRepositoryError> {
        if self
            .database
            .fetch_row(&query::enquiry_exists(enquiry_id))
            .await?
            .is_none()
        {
            return Err(FollowUpRepositoryError::EnquiryNotFound(enquiry_id));
        }

        let rows = self
            .database
            .fetch_rows(&query::list_follow_ups(enquiry_id))
            .await?;
        let follow_ups = rows
            .iter()
            .map(follow_up_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(follow_ups)
    }
}
