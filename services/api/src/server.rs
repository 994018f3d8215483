use crate::cli::ServeArgs;
use crate::infra::{apply_store_overrides, open_service, AppState};
use crate::routes::with_request_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fispa::config::AppConfig;
use fispa::error::AppError;
use fispa::requests::SharedSecretPolicy;
use fispa::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    apply_store_overrides(&mut config, args.store);

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = open_service(&config)?;
    if config.admin.admin_token.is_none() {
        warn!("APP_ADMIN_TOKEN is not set; staff endpoints will refuse every request");
    }
    let access = Arc::new(SharedSecretPolicy::from_config(&config.admin));

    let app = with_request_routes(service, access)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.storage.database_path.display(),
        "request desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
