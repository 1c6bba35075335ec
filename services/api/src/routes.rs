use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use loan_intake::catalog::{self, LoanProduct, PlatformStats};
use loan_intake::intake::{application_router, ApplicationRepository, IntakeService, ObjectStore};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_application_routes<R, S>(service: Arc<IntakeService<R, S>>) -> axum::Router
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    application_router(service)
        .route("/api/health", get(healthcheck))
        .route("/api/stats", get(stats_endpoint))
        .route("/api/loan-types", get(loan_types_endpoint))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}

pub(crate) async fn stats_endpoint() -> Json<PlatformStats> {
    Json(catalog::platform_stats())
}

pub(crate) async fn loan_types_endpoint() -> Json<&'static [LoanProduct]> {
    Json(catalog::loan_products())
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
