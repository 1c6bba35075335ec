use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use loan_intake::backend::{
    BackendClient, BackendError, RestApplicationRepository, RestObjectStore,
};
use loan_intake::config::BackendConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Row and object adapters sharing one HTTP client.
pub(crate) fn rest_backend(
    config: &BackendConfig,
) -> Result<(RestApplicationRepository, RestObjectStore), BackendError> {
    let client = BackendClient::new(config)?;
    Ok((
        RestApplicationRepository::new(client.clone()),
        RestObjectStore::new(client),
    ))
}
