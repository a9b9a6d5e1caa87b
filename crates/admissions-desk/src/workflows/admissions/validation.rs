//! Pure checks run before anything touches the store.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

use super::domain::{
    EnquiryDraft, EnquiryFilter, EnquiryPatch, EnquiryUpdate, FieldChange, FollowUpDraft,
    ListEnquiriesParams, NewEnquiry, NewFollowUp, Stage,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Caller-correctable input problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("phone must be 7-15 characters with numbers, +, -, or spaces only")]
    InvalidPhone,
    #[error("due_on must be a valid date")]
    InvalidDate,
    #[error("at least one field must be provided for update")]
    EmptyUpdate,
    #[error("invalid stage value: {0}")]
    UnknownStage(String),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

fn phone_regex() -> Option<&'static Regex> {
    static PHONE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    PHONE_REGEX
        .get_or_init(|| Regex::new(r"^[0-9+\-\s]{7,15}$").ok())
        .as_ref()
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_some_and(|pattern| pattern.is_match(phone))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub fn validate_enquiry_create(draft: EnquiryDraft) -> Result<NewEnquiry, ValidationError> {
    let student_name = required(draft.student_name, "student_name")?;
    let class_applied = required(draft.class_applied, "class_applied")?;
    let guardian_name = required(draft.guardian_name, "guardian_name")?;
    let phone = required(draft.phone, "phone")?;

    if !is_valid_phone(&phone) {
        return Err(ValidationError::InvalidPhone);
    }

    Ok(NewEnquiry {
        student_name,
        class_applied,
        guardian_name,
        phone,
        source: optional(draft.source),
        notes: optional(draft.notes),
    })
}

/// Accepts a bare calendar date or an RFC 3339 timestamp, keeping only the date.
pub fn parse_due_on(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|stamp| stamp.date_naive()))
        .map_err(|_| ValidationError::InvalidDate)
}

pub fn validate_follow_up_create(draft: FollowUpDraft) -> Result<NewFollowUp, ValidationError> {
    let due_on = required(draft.due_on, "due_on")?;
    let due_on = parse_due_on(&due_on)?;

    Ok(NewFollowUp {
        due_on,
        outcome: optional(draft.outcome),
        note: optional(draft.note),
    })
}

pub fn validate_enquiry_update(patch: EnquiryPatch) -> Result<EnquiryUpdate, ValidationError> {
    let mut changes = Vec::new();

    if let Some(stage) = patch.stage {
        let stage = stage.ok_or_else(|| ValidationError::UnknownStage("null".to_string()))?;
        changes.push(FieldChange::Stage(stage.parse::<Stage>()?));
    }
    if let Some(notes) = patch.notes {
        changes.push(FieldChange::Notes(optional(notes)));
    }
    if let Some(class_applied) = patch.class_applied {
        changes.push(FieldChange::ClassApplied(required(
            class_applied,
            "class_applied",
        )?));
    }
    if let Some(source) = patch.source {
        changes.push(FieldChange::Source(optional(source)));
    }

    EnquiryUpdate::new(changes)
}

/// Clamp pagination and drop blank filters.
pub fn normalize_list_params(params: ListEnquiriesParams) -> EnquiryFilter {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(0, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    EnquiryFilter {
        stage: params.stage.filter(|stage| !stage.is_empty()),
        class_applied: params.class_applied.filter(|class| !class.is_empty()),
        search: optional(params.q),
        limit,
        offset,
    }
}
