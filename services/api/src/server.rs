use crate::cli::ServeArgs;
use crate::infra::{rest_backend, AppState};
use crate::routes::with_application_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use loan_intake::config::AppConfig;
use loan_intake::error::AppError;
use loan_intake::intake::{InMemoryApplicationRepository, InMemoryObjectStore, IntakeService};
use loan_intake::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = application(&config)
        .await?
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    warn!("admin routes under /api/admin are served without authentication");

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_document_bytes = config.intake.max_document_bytes,
        document_policy = ?config.intake.document_policy,
        "loan intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn application(config: &AppConfig) -> Result<Router, AppError> {
    match &config.backend {
        Some(backend) => {
            let (repository, objects) = rest_backend(backend)?;
            if let Err(err) = objects.ensure_bucket().await {
                warn!(error = %err, bucket = objects.bucket(), "documents bucket check failed");
            }
            info!(backend = %backend.base_url, "using managed backend");
            let service = IntakeService::new(Arc::new(repository), Arc::new(objects), &config.intake);
            Ok(with_application_routes(Arc::new(service)))
        }
        None => {
            warn!("APP_BACKEND_URL not set; applications and documents are kept in memory");
            let service = IntakeService::new(
                Arc::new(InMemoryApplicationRepository::default()),
                Arc::new(InMemoryObjectStore::default()),
                &config.intake,
            );
            Ok(with_application_routes(Arc::new(service)))
        }
    }
}
