use admissions_desk::config::AppConfig;
use admissions_desk::workflows::admissions::{Database, StoreError};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) async fn open_database(
    config: &AppConfig,
    url_override: Option<String>,
) -> Result<Database, StoreError> {
    let url = url_override.unwrap_or_else(|| config.database.url.clone());
    let database = Database::connect(&url, config.database.max_connections).await?;
    info!(
        store = %loggable_url(&url),
        max_connections = config.database.max_connections,
        "enquiry store ready"
    );
    Ok(database)
}

/// SQLite file paths carry no secrets; any other scheme is reduced to its name.
pub(crate) fn loggable_url(url: &str) -> String {
    match url.split_once(':') {
        Some(("sqlite", rest)) => {
            let path = rest.split('?').next().unwrap_or(rest);
            format!("sqlite:{path}")
        }
        Some((scheme, _)) => format!("{scheme}://<redacted>"),
        None => "<unrecognized>".to_string(),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
