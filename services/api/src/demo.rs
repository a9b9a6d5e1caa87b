use crate::infra::open_database;
use admissions_desk::config::AppConfig;
use admissions_desk::error::AppError;
use admissions_desk::workflows::admissions::{
    AdmissionsService, Database, EnquiryDraft, EnquiryPatch, FollowUpDraft, Stage, StageSummary,
};
use chrono::{Local, NaiveDate};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct SummaryArgs {
    /// Restrict counts to one class (e.g. "Grade 3")
    #[arg(long)]
    pub(crate) class: Option<String>,
    /// Override DATABASE_URL
    #[arg(long)]
    pub(crate) database_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Student name used for the sample enquiry
    #[arg(long, default_value = "Asha Rao")]
    pub(crate) student: String,
    /// Guardian name used for the sample enquiry
    #[arg(long, default_value = "Meera Rao")]
    pub(crate) guardian: String,
    /// Class the student is applying for
    #[arg(long, default_value = "Grade 3")]
    pub(crate) class: String,
    /// Guardian phone number
    #[arg(long, default_value = "+1-555-123-4567")]
    pub(crate) phone: String,
    /// Follow-up due date (YYYY-MM-DD). Defaults to seven days from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) due_on: Option<NaiveDate>,
}

pub(crate) async fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let database = open_database(&config, args.database_url).await?;
    let service = AdmissionsService::new(database.clone());

    let summary = service.summary(args.class.as_deref()).await?;
    render_summary(&summary, args.class.as_deref());

    database.close().await;
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        student,
        guardian,
        class,
        phone,
        due_on,
    } = args;
    let due_on = due_on.unwrap_or_else(|| Local::now().date_naive() + chrono::Duration::days(7));

    let database = Database::in_memory().await?;
    let service = AdmissionsService::new(database.clone());

    println!("Admissions desk demo (scratch in-memory store)");

    let id = service
        .create_enquiry(EnquiryDraft {
            student_name: Some(student),
            class_applied: Some(class.clone()),
            guardian_name: Some(guardian),
            phone: Some(phone),
            source: Some("Demo".to_string()),
            notes: None,
        })
        .await?;
    let enquiry = service.get_enquiry(id).await?;
    println!(
        "- Enquiry {} for {} ({}) recorded at stage {}",
        enquiry.id,
        enquiry.student_name,
        enquiry.class_applied,
        enquiry.stage.label()
    );

    let enquiry = service
        .update_enquiry(
            id,
            EnquiryPatch {
                stage: Some(Some(Stage::Scheduled.as_str().to_string())),
                notes: Some(Some("Interview booked with admissions lead".to_string())),
                ..EnquiryPatch::default()
            },
        )
        .await?;
    println!(
        "- Moved to {} | notes: {}",
        enquiry.stage.label(),
        enquiry.notes.as_deref().unwrap_or("-")
    );

    service
        .create_follow_up(
            id,
            FollowUpDraft {
                due_on: Some(due_on.format("%Y-%m-%d").to_string()),
                outcome: None,
                note: Some("Confirm interview attendance".to_string()),
            },
        )
        .await?;

    println!("\nFollow-up timeline");
    for follow_up in service.list_follow_ups(id).await? {
        println!(
            "- due {} | outcome {} | {}",
            follow_up.due_on,
            follow_up.outcome.as_deref().unwrap_or("pending"),
            follow_up.note.as_deref().unwrap_or("")
        );
    }

    let summary = service.summary(None).await?;
    render_summary(&summary, None);

    database.close().await;
    Ok(())
}

fn render_summary(summary: &StageSummary, class: Option<&str>) {
    match class.filter(|class| !class.is_empty()) {
        Some(class) => println!("\nStage summary for {class}"),
        None => println!("\nStage summary (all classes)"),
    }
    for stage in Stage::ordered() {
        println!("- {}: {}", stage.label(), summary.count(stage));
    }
    println!("Total enquiries: {}", summary.total);
}
