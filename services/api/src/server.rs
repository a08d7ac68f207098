use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryApplicationRepository, InMemoryDocumentStore, LoggingMailer,
    SimulatedPaymentGateway,
};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use greenland_leasing::config::AppConfig;
use greenland_leasing::error::AppError;
use greenland_leasing::telemetry;
use greenland_leasing::workflows::application::{ApplicationService, FeeSchedule};
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
    };

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let gateway = Arc::new(SimulatedPaymentGateway::default());
    let mailer = Arc::new(LoggingMailer::default());
    let documents = Arc::new(InMemoryDocumentStore::default());
    let application_service = Arc::new(ApplicationService::new(
        repository,
        gateway,
        mailer,
        documents,
        FeeSchedule::default(),
        config.payments.clone(),
        config.email.clone(),
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "leasing application service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
