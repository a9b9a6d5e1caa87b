use crate::cli::ServeArgs;
use crate::infra::{open_database, AppState};
use crate::routes::with_admissions_routes;
use admissions_desk::config::AppConfig;
use admissions_desk::error::AppError;
use admissions_desk::telemetry;
use admissions_desk::workflows::admissions::AdmissionsService;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let database = open_database(&config, args.database_url.take()).await?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let admissions_service = Arc::new(AdmissionsService::new(database));

    let app = with_admissions_routes(admissions_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
