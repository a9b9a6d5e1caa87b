use super::domain::{
    Enquiry, EnquiryDraft, EnquiryId, EnquiryPage, EnquiryPatch, FollowUp, FollowUpDraft,
    FollowUpId, ListEnquiriesParams, StageSummary,
};
use super::enquiries::{EnquiryRepository, EnquiryRepositoryError};
use super::follow_ups::{FollowUpRepository, FollowUpRepositoryError};
use super::report::StageReporter;
use super::store::{Database, StoreError};
use super::validation::{
    normalize_list_params, validate_enquiry_create, validate_enquiry_update,
    validate_follow_up_create, ValidationError,
};

/// Service composing validation, the two repositories, and the stage reporter.
///
/// Every operation validates first, so a rejected request never reaches the store.
#[derive(Debug, Clone)]
pub struct AdmissionsService {
    enquiries: EnquiryRepository,
    follow_ups: FollowUpRepository,
    reports: StageReporter,
}

impl AdmissionsService {
    pub fn new(database: Database) -> Self {
        Self {
            enquiries: EnquiryRepository::new(database.clone()),
            follow_ups: FollowUpRepository::new(database.clone()),
            reports: StageReporter::new(database),
        }
    }

    pub async fn create_enquiry(&self, draft: EnquiryDraft) -> Result<EnquiryId, AdmissionsError> {
        let enquiry = validate_enquiry_create(draft)?;
        Ok(self.enquiries.create(&enquiry).await?)
    }

    pub async fn get_enquiry(&self, id: EnquiryId) -> Result<Enquiry, AdmissionsError> {
        self.enquiries
            .fetch(id)
            .await?
            .ok_or(AdmissionsError::EnquiryNotFound(id))
    }

    pub async fn update_enquiry(
        &self,
        id: EnquiryId,
        patch: EnquiryPatch,
    ) -> Result<Enquiry, AdmissionsError> {
        let update = validate_enquiry_update(patch)?;
        Ok(self.enquiries.update(id, &update).await?)
    }

    pub async fn list_enquiries(
        &self,
        params: ListEnquiriesParams,
    ) -> Result<EnquiryPage, AdmissionsError> {
        let filter = normalize_list_params(params);
        Ok(self.enquiries.list(&filter).await?)
    }

    pub async fn create_follow_up(
        &self,
        enquiry_id: EnquiryId,
        draft: FollowUpDraft,
    ) -> Result<FollowUpId, AdmissionsError> {
        let follow_up = validate_follow_up_create(draft)?;
        Ok(self.follow_ups.create(enquiry_id, &follow_up).await?)
    }

    pub async fn list_follow_ups(
        &self,
        enquiry_id: EnquiryId,
    ) -> Result<Vec<FollowUp>, AdmissionsError> {
        Ok(self.follow_ups.list_by_enquiry(enquiry_id).await?)
    }

    /// Stage counts, optionally for a single class. A blank class means all classes.
    pub async fn summary(&self, class_applied: Option<&str>) -> Result<StageSummary, AdmissionsError> {
        let class_applied = class_applied.filter(|class| !class.is_empty());
        Ok(self.reports.summarize(class_applied).await?)
    }
}

/// The three failure kinds callers can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

/// Error raised by the admissions service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("enquiry not found")]
    EnquiryNotFound(EnquiryId),
    #[error("{0}")]
    Internal(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdmissionsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::InvalidArgument,
            Self::EnquiryNotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<EnquiryRepositoryError> for AdmissionsError {
    fn from(value: EnquiryRepositoryError) -> Self {
        match value {
            EnquiryRepositoryError::NotFound(id) => Self::EnquiryNotFound(id),
            EnquiryRepositoryError::MissingIdentity => Self::Internal("failed to create enquiry"),
            EnquiryRepositoryError::Store(err) => Self::Store(err),
        }
    }
}

impl From<FollowUpRepositoryError> for AdmissionsError {
    fn from(value: FollowUpRepositoryError) -> Self {
        match value {
            FollowUpRepositoryError::EnquiryNotFound(id) => Self::EnquiryNotFound(id),
            FollowUpRepositoryError::Store(err) => Self::Store(err),
        }
    }
}
