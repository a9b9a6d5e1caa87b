use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{
    CreatedId, Enquiry, EnquiryDraft, EnquiryId, EnquiryPage, EnquiryPatch, FollowUp,
    FollowUpDraft, ListEnquiriesParams, StageSummary,
};
use super::service::{AdmissionsError, AdmissionsService, ErrorKind};
use super::validation::ValidationError;

type SharedService = Arc<AdmissionsService>;

/// Router builder exposing enquiry intake, follow-ups, and stage reporting.
pub fn admissions_router(service: SharedService) -> Router {
    Router::new()
        .route(
            "/enquiries",
            post(create_enquiry_handler).get(list_enquiries_handler),
        )
        .route(
            "/enquiries/:id",
            get(get_enquiry_handler).patch(update_enquiry_handler),
        )
        .route(
            "/enquiries/:id/followups",
            post(create_follow_up_handler).get(list_follow_ups_handler),
        )
        .route("/reports/enquiries-summary", get(summary_handler))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SummaryParams {
    #[serde(default, rename = "class")]
    pub(crate) class_applied: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FollowUpList {
    pub(crate) followups: Vec<FollowUp>,
}

impl IntoResponse for AdmissionsError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AdmissionsError::Store(err) => {
                error!(error = %err, "enquiry store failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "code": kind.code(), "message": message }));
        (status, body).into_response()
    }
}

// Extractor rejections surface as invalid arguments.
impl From<JsonRejection> for AdmissionsError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::MalformedRequest(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for AdmissionsError {
    fn from(rejection: QueryRejection) -> Self {
        ValidationError::MalformedRequest(rejection.body_text()).into()
    }
}

impl From<PathRejection> for AdmissionsError {
    fn from(rejection: PathRejection) -> Self {
        ValidationError::MalformedRequest(rejection.body_text()).into()
    }
}

pub(crate) async fn create_enquiry_handler(
    State(service): State<SharedService>,
    payload: Result<Json<EnquiryDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedId>), AdmissionsError> {
    let Json(draft) = payload?;
    let id = service.create_enquiry(draft).await?;
    Ok((StatusCode::CREATED, Json(CreatedId { id: id.0 })))
}

pub(crate) async fn list_enquiries_handler(
    State(service): State<SharedService>,
    params: Result<Query<ListEnquiriesParams>, QueryRejection>,
) -> Result<Json<EnquiryPage>, AdmissionsError> {
    let Query(params) = params?;
    Ok(Json(service.list_enquiries(params).await?))
}

pub(crate) async fn get_enquiry_handler(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Enquiry>, AdmissionsError> {
    let Path(id) = id?;
    Ok(Json(service.get_enquiry(EnquiryId(id)).await?))
}

pub(crate) async fn update_enquiry_handler(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EnquiryPatch>, JsonRejection>,
) -> Result<Json<Enquiry>, AdmissionsError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    Ok(Json(service.update_enquiry(EnquiryId(id), patch).await?))
}

pub(crate) async fn create_follow_up_handler(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<FollowUpDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedId>), AdmissionsError> {
    let Path(id) = id?;
    let Json(draft) = payload?;
    let follow_up_id = service.create_follow_up(EnquiryId(id), draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedId {
            id: follow_up_id.0,
        }),
    ))
}

pub(crate) async fn list_follow_ups_handler(
    State(service): State<SharedService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<FollowUpList>, AdmissionsError> {
    let Path(id) = id?;
    let followups = service.list_follow_ups(EnquiryId(id)).await?;
    Ok(Json(FollowUpList { followups }))
}

pub(crate) async fn summary_handler(
    State(service): State<SharedService>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Json<StageSummary>, AdmissionsError> {
    let Query(params) = params?;
    Ok(Json(
        service.summary(params.class_applied.as_deref()).await?,
    ))
}
