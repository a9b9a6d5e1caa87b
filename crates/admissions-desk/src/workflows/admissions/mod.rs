//! Admissions enquiry pipeline: intake, partial updates, follow-up timelines, and stage
//! reporting over a SQLite store.

pub mod domain;
pub mod enquiries;
pub mod follow_ups;
pub mod query;
pub mod report;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    CreatedId, Enquiry, EnquiryDraft, EnquiryFilter, EnquiryId, EnquiryPage, EnquiryPatch,
    EnquiryUpdate, FieldChange, FollowUp, FollowUpDraft, FollowUpId, ListEnquiriesParams,
    NewEnquiry, NewFollowUp, Stage, StageSummary,
};
pub use enquiries::{EnquiryRepository, EnquiryRepositoryError};
pub use follow_ups::{FollowUpRepository, FollowUpRepositoryError};
pub use report::StageReporter;
pub use router::admissions_router;
pub use service::{AdmissionsError, AdmissionsService, ErrorKind};
pub use store::{Database, StoreError};
pub use validation::ValidationError;
