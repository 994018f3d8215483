use crate::cli::StoreArgs;
use fispa::config::AppConfig;
use fispa::error::AppError;
use fispa::requests::{RequestIntakeService, SqliteRequestStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Apply command-line storage overrides on top of the loaded configuration.
pub(crate) fn apply_store_overrides(config: &mut AppConfig, args: StoreArgs) {
    if let Some(database) = args.database {
        config.storage.database_path = database;
    }
}

/// Open the configured database, creating the request table when missing.
pub(crate) fn open_service(
    config: &AppConfig,
) -> Result<Arc<RequestIntakeService<SqliteRequestStore>>, AppError> {
    let store = SqliteRequestStore::open(&config.storage.database_path)?;
    Ok(Arc::new(RequestIntakeService::new(Arc::new(store))))
}
