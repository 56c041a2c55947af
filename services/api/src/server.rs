use crate::cli::ServeArgs;
use crate::infra::{AppState, DirectoryLoanRepository, FileReportArchive};
use crate::routes::with_loan_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_ops::config::AppConfig;
use loan_ops::error::AppError;
use loan_ops::telemetry;
use loan_ops::workflows::loan::{LoanOperationsService, PipelineRunner};
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        loans_dir: config.storage.loans_dir.clone(),
    };

    let repository = Arc::new(DirectoryLoanRepository::new(&config.storage.loans_dir));
    let archive = Arc::new(FileReportArchive::new(&config.storage.output_dir));
    let service = Arc::new(LoanOperationsService::new(
        repository,
        archive,
        PipelineRunner::new(config.funding.clone()),
    ));

    let app = with_loan_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        loans_dir = %config.storage.loans_dir.display(),
        "loan operations service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
