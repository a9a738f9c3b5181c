use crate::cli::ServeArgs;
use crate::infra::{build_engine, load_directory, AppState};
use crate::routes::with_council_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use works_council::config::AppConfig;
use works_council::error::AppError;
use works_council::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(roster) = args.roster.take() {
        config.council.employee_roster = Some(roster);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = load_directory(config.council.employee_roster.as_deref())?;
    let engine = build_engine(directory, config.council.policy);
    let shutdown = CancellationToken::new();

    let app = with_council_routes(engine, shutdown.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        policy = ?config.council.policy,
        "works council service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown, readiness_flag))
        .await?;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken, readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal; serving until killed");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    shutdown.cancel();
    info!("shutdown requested; cancelling in-flight membership operations");
}
