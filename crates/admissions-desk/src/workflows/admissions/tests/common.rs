use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use serde_json::Value;

use crate::workflows::admissions::domain::{EnquiryDraft, EnquiryId, FollowUpDraft};
use crate::workflows::admissions::store::Database;
use crate::workflows::admissions::{admissions_router, AdmissionsService};

pub(super) async fn database() -> Database {
    Database::in_memory().await.expect("in-memory database opens")
}

pub(super) async fn build_service() -> (AdmissionsService, Database) {
    let database = database().await;
    (AdmissionsService::new(database.clone()), database)
}

pub(super) fn draft(student: &str, guardian: &str, class: &str, phone: &str) -> EnquiryDraft {
    EnquiryDraft {
        student_name: Some(student.to_string()),
        class_applied: Some(class.to_string()),
        guardian_name: Some(guardian.to_string()),
        phone: Some(phone.to_string()),
        source: None,
        notes: None,
    }
}

pub(super) fn asha() -> EnquiryDraft {
    EnquiryDraft {
        source: Some(" Open day ".to_string()),
        notes: Some("Interested in the music programme".to_string()),
        ..draft("  Asha Rao ", "Meera Rao", "Grade 3", "+1-555-123-4567")
    }
}

pub(super) fn follow_up(due_on: &str, note: &str) -> FollowUpDraft {
    FollowUpDraft {
        due_on: Some(due_on.to_string()),
        outcome: None,
        note: Some(note.to_string()),
    }
}

pub(super) async fn seed(service: &AdmissionsService, draft: EnquiryDraft) -> EnquiryId {
    service
        .create_enquiry(draft)
        .await
        .expect("seed enquiry is valid")
}

pub(super) async fn table_count(database: &Database, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(database.pool())
        .await
        .expect("count query runs")
}

pub(super) fn router_with_service(service: AdmissionsService) -> axum::Router {
    admissions_router(Arc::new(service))
}

pub(super) fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("body serializes")))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
