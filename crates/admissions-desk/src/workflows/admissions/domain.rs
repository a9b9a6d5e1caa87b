use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::validation::ValidationError;

/// Store-assigned identity of an enquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnquiryId(pub i64);

impl fmt::Display for EnquiryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned identity of a follow-up entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FollowUpId(pub i64);

/// Position of an enquiry in the admissions pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    New,
    Contacted,
    Scheduled,
    Admitted,
    Lost,
}

impl Stage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::New,
            Self::Contacted,
            Self::Scheduled,
            Self::Admitted,
            Self::Lost,
        ]
    }

    /// Column value persisted in the store.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Scheduled => "scheduled",
            Self::Admitted => "admitted",
            Self::Lost => "lost",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Scheduled => "Scheduled",
            Self::Admitted => "Admitted",
            Self::Lost => "Lost",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownStage(value.to_string()))
    }
}

/// Admissions record for one prospective student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enquiry {
    pub id: EnquiryId,
    pub student_name: String,
    pub class_applied: String,
    pub guardian_name: String,
    pub phone: String,
    pub source: Option<String>,
    pub stage: Stage,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Dated action or outcome logged against an enquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUp {
    pub id: FollowUpId,
    pub enquiry_id: EnquiryId,
    pub due_on: NaiveDate,
    pub outcome: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw intake payload as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnquiryDraft {
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub class_applied: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Trimmed and checked intake fields ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnquiry {
    pub student_name: String,
    pub class_applied: String,
    pub guardian_name: String,
    pub phone: String,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Raw follow-up payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpDraft {
    #[serde(default)]
    pub due_on: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFollowUp {
    pub due_on: NaiveDate,
    pub outcome: Option<String>,
    pub note: Option<String>,
}

/// Raw PATCH payload.
///
/// The outer `Option` records whether the key was sent at all; the inner one whether it carried
/// `null`. Validation folds this into an [`EnquiryUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnquiryPatch {
    #[serde(default, deserialize_with = "present")]
    pub stage: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub class_applied: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub source: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// One column assignment of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Stage(Stage),
    Notes(Option<String>),
    ClassApplied(String),
    Source(Option<String>),
}

impl FieldChange {
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Stage(_) => "stage",
            Self::Notes(_) => "notes",
            Self::ClassApplied(_) => "class_applied",
            Self::Source(_) => "source",
        }
    }
}

/// Ordered, non-empty list of the fields a caller explicitly supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnquiryUpdate {
    changes: Vec<FieldChange>,
}

impl EnquiryUpdate {
    pub(crate) fn new(changes: Vec<FieldChange>) -> Result<Self, ValidationError> {
        if changes.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        Ok(Self { changes })
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }
}

/// Raw listing parameters, mirroring the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListEnquiriesParams {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, rename = "class")]
    pub class_applied: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Normalized listing filter with pagination already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnquiryFilter {
    pub stage: Option<String>,
    pub class_applied: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// One page of enquiries plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnquiryPage {
    pub items: Vec<Enquiry>,
    pub total: i64,
}

/// Per-stage enquiry counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    #[serde(rename = "byStage")]
    pub by_stage: BTreeMap<Stage, i64>,
    pub total: i64,
}

impl StageSummary {
    /// Summary with every stage present at zero.
    pub fn empty() -> Self {
        Self {
            by_stage: Stage::ordered().into_iter().map(|stage| (stage, 0)).collect(),
            total: 0,
        }
    }

    pub fn count(&self, stage: Stage) -> i64 {
        self.by_stage.get(&stage).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreatedId {
    pub id: i64,
}
