//! Admissions enquiry pipeline.
//!
//! Tracks prospective-student enquiries from intake through guardian contact, scheduling, and
//! an admission decision, with a dated follow-up timeline per enquiry and stage reporting.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
