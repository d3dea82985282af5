use crate::cli::ServeArgs;
use crate::infra::{seed_roster, AppState, InMemoryAlertPublisher, InMemoryAutoMatchRepository};
use crate::routes::with_automatch_routes;
use automatch::config::AppConfig;
use automatch::error::AppError;
use automatch::matching::AutoMatchService;
use automatch::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryAutoMatchRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let automatch_service = Arc::new(AutoMatchService::new(
        repository,
        alerts,
        config.automatch.service_config(),
    ));

    if let Some(path) = config.automatch.roster_path.as_deref() {
        seed_roster(&automatch_service, path)?;
    }

    let app = with_automatch_routes(automatch_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        reference_year = config.automatch.reference_year,
        top_n = config.automatch.top_n,
        "automatch service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
