use tracing::info;

use super::domain::{Enquiry, EnquiryFilter, EnquiryId, EnquiryPage, EnquiryUpdate, NewEnquiry};
use super::query;
use super::store::{enquiry_from_row, Database, StoreError};

/// Outcomes the enquiry repository reports besides store faults.
#[derive(Debug, thiserror::Error)]
pub enum EnquiryRepositoryError {
    #[error("enquiry {0} not found")]
    NotFound(EnquiryId),
    #[error("failed to create enquiry")]
    MissingIdentity,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create, fetch, patch, and page through enquiries.
#[derive(Debug, Clone)]
pub struct EnquiryRepository {
    database: Database,
}

impl EnquiryRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Insert a validated enquiry at stage `new`.
    pub async fn create(&self, enquiry: &NewEnquiry) -> Result<EnquiryId, EnquiryRepositoryError> {
        let id = self
            .database
            .insert_returning_id(&query::insert_enquiry(enquiry))
            .await?
            .map(EnquiryId)
            .ok_or(EnquiryRepositoryError::MissingIdentity)?;

        info!(enquiry_id = %id, class_applied = %enquiry.class_applied, "enquiry created");
        Ok(id)
    }

    pub async fn fetch(&self, id: EnquiryId) -> Result<Option<Enquiry>, EnquiryRepositoryError> {
        let row = self.database.fetch_row(&query::select_enquiry(id)).await?;
        Ok(row.as_ref().map(enquiry_from_row).transpose()?)
    }

    /// Apply the supplied fields and return the row as stored afterwards.
    pub async fn update(
        &self,
        id: EnquiryId,
        update: &EnquiryUpdate,
    ) -> Result<Enquiry, EnquiryRepositoryError> {
        let row = self
            .database
            .fetch_row(&query::update_enquiry(id, update))
            .await?
            .ok_or(EnquiryRepositoryError::NotFound(id))?;
        let enquiry = enquiry_from_row(&row)?;

        let fields: Vec<&str> = update.changes().iter().map(|change| change.column()).collect();
        info!(enquiry_id = %id, stage = %enquiry.stage, ?fields, "enquiry updated");
        Ok(enquiry)
    }

    pub async fn list(&self, filter: &EnquiryFilter) -> Result<EnquiryPage, EnquiryRepositoryError> {
        let total = self.database.count(&query::count_enquiries(filter)).await?;
        let rows = self.database.fetch_rows(&query::list_enquiries(filter)).await?;
        let items = rows
            .iter()
            .map(enquiry_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EnquiryPage { items, total })
    }
}
