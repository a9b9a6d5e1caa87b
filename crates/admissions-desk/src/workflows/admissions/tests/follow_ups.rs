use chrono::NaiveDate;

use super::common::*;
use crate::workflows::admissions::domain::{EnquiryId, FollowUpDraft};
use crate::workflows::admissions::follow_ups::{FollowUpRepository, FollowUpRepositoryError};
use crate::workflows::admissions::validation::validate_follow_up_create;
use crate::workflows::admissions::{AdmissionsError, ErrorKind};

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

#[tokio::test]
async fn create_against_missing_enquiry_writes_nothing() {
    let database = database().await;
    let repository = FollowUpRepository::new(database.clone());
    let follow_up =
        validate_follow_up_create(follow_up("2024-06-01", "call guardian")).expect("valid");

    match repository.create(EnquiryId(999), &follow_up).await {
        Err(FollowUpRepositoryError::EnquiryNotFound(EnquiryId(999))) => {}
        other => panic!("expected enquiry not found, got {other:?}"),
    }
    assert_eq!(table_count(&database, "followups").await, 0);
}

#[tokio::test]
async fn create_normalizes_blank_outcome_and_note() {
    let (service, _database) = build_service().await;
    let enquiry_id = seed(&service, asha()).await;

    service
        .create_follow_up(
            enquiry_id,
            FollowUpDraft {
                due_on: Some("2024-06-01".to_string()),
                outcome: Some("   ".to_string()),
                note: Some(String::new()),
            },
        )
        .await
        .expect("follow-up created");

    let follow_ups = service
        .list_follow_ups(enquiry_id)
        .await
        .expect("list succeeds");
    assert_eq!(follow_ups.len(), 1);
    assert_eq!(follow_ups[0].enquiry_id, enquiry_id);
    assert_eq!(follow_ups[0].due_on, date("2024-06-01"));
    assert_eq!(follow_ups[0].outcome, None);
    assert_eq!(follow_ups[0].note, None);
}

#[tokio::test]
async fn list_orders_by_due_date_then_most_recently_logged() {
    let (service, _database) = build_service().await;
    let enquiry_id = seed(&service, asha()).await;

    let later = service
        .create_follow_up(enquiry_id, follow_up("2024-06-03", "campus tour"))
        .await
        .expect("created");
    let early_first = service
        .create_follow_up(enquiry_id, follow_up("2024-06-01", "first call"))
        .await
        .expect("created");
    let early_second = service
        .create_follow_up(enquiry_id, follow_up("2024-06-01", "second call"))
        .await
        .expect("created");

    let ids: Vec<_> = service
        .list_follow_ups(enquiry_id)
        .await
        .expect("list succeeds")
        .into_iter()
        .map(|follow_up| follow_up.id)
        .collect();
    assert_eq!(ids, vec![early_second, early_first, later]);
}

#[tokio::test]
async fn list_is_scoped_to_one_enquiry() {
    let (service, _database) = build_service().await;
    let asha_id = seed(&service, asha()).await;
    let liam_id = seed(&service, draft("Liam Chen", "Wei Chen", "Grade 3", "5550100")).await;

    service
        .create_follow_up(asha_id, follow_up("2024-06-01", "asha"))
        .await
        .expect("created");

    assert!(service
        .list_follow_ups(liam_id)
        .await
        .expect("list succeeds")
        .is_empty());
}

#[tokio::test]
async fn list_for_missing_enquiry_is_not_found() {
    let (service, _database) = build_service().await;

    let err = service
        .list_follow_ups(EnquiryId(5))
        .await
        .expect_err("missing enquiry rejected");
    assert!(matches!(err, AdmissionsError::EnquiryNotFound(EnquiryId(5))));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn invalid_date_is_rejected_before_lookup() {
    let (service, database) = build_service().await;

    let err = service
        .create_follow_up(EnquiryId(5), follow_up("06/01/2024", "call"))
        .await
        .expect_err("bad date rejected");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(table_count(&database, "followups").await, 0);
}
