use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::documents::ObjectStore;
use super::domain::{ApplicationId, DocumentSlot};
use super::repository::ApplicationRepository;
use super::service::{IntakeError, IntakeService, ReviewRequest};
use super::validation::{DocumentPart, FileRejection, SubmissionForm};

pub const SUBMISSION_ACCEPTED_MESSAGE: &str =
    "Application submitted successfully! Our team will contact you within 24 hours.";

/// Router builder exposing the intake, status, and admin endpoints.
pub fn application_router<R, S>(service: Arc<IntakeService<R, S>>) -> Router
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    let body_limit = service.config().body_limit();

    Router::new()
        .route(
            "/api/applications",
            post(submit_handler::<R, S>).get(lookup_handler::<R, S>),
        )
        .route(
            "/api/applications/:application_id",
            get(status_handler::<R, S>),
        )
        .route("/api/admin/applications", get(list_handler::<R, S>))
        .route(
            "/api/admin/applications/:application_id",
            patch(review_handler::<R, S>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LookupQuery {
    pub(crate) id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReviewBody {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

fn error_body(status: StatusCode, error: &str, details: Option<String>) -> Response {
    let payload = match details {
        Some(details) => json!({ "error": error, "details": details }),
        None => json!({ "error": error }),
    };
    (status, Json(payload)).into_response()
}

fn not_found() -> Response {
    error_body(StatusCode::NOT_FOUND, "Application not found", None)
}

fn rejected_documents_payload(rejections: &[FileRejection]) -> Value {
    Value::Array(
        rejections
            .iter()
            .map(|rejection| {
                json!({
                    "field": rejection.slot().field_name(),
                    "error": rejection.to_string(),
                })
            })
            .collect(),
    )
}

fn submission_error(err: IntakeError) -> Response {
    match err {
        IntakeError::Validation(error) => {
            let title = if error.has_missing_fields() {
                "Missing required fields"
            } else {
                "Invalid application"
            };
            let payload = json!({
                "error": title,
                "details": error.details(),
                "violations": error.violations,
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        IntakeError::DocumentsRejected(rejections) => {
            let details = rejections
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            let payload = json!({
                "error": "Invalid document upload",
                "details": details,
                "rejectedDocuments": rejected_documents_payload(&rejections),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        IntakeError::Repository(error) => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to submit application",
            Some(error.to_string()),
        ),
        IntakeError::InvalidStatus(_) | IntakeError::NotFound => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            Some(err.to_string()),
        ),
    }
}

async fn read_form(
    mut multipart: Multipart,
    max_document_bytes: usize,
) -> Result<SubmissionForm, Response> {
    let mut form = SubmissionForm::default();
    let failed = |err: MultipartError| multipart_error(&err, max_document_bytes);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(failed(err)),
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(slot) = DocumentSlot::from_field_name(&name) {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(failed)?;
            form.documents.push(DocumentPart {
                slot,
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else if field.file_name().is_some() {
            debug!(field = %name, "ignoring unexpected file part");
        } else {
            let value = field.text().await.map_err(failed)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn multipart_error(err: &MultipartError, max_document_bytes: usize) -> Response {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let megabytes = max_document_bytes / (1024 * 1024);
        return error_body(
            StatusCode::BAD_REQUEST,
            "File size too large",
            Some(format!("Maximum {megabytes}MB allowed per document.")),
        );
    }
    error_body(
        StatusCode::BAD_REQUEST,
        "Malformed multipart body",
        Some(err.body_text()),
    )
}

pub(crate) async fn submit_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    let max_document_bytes = service.config().max_document_bytes;
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                "Expected a multipart/form-data body",
                Some(rejection.body_text()),
            )
        }
    };

    let form = match read_form(multipart, max_document_bytes).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    submit_form(&service, form).await
}

/// Runs a decoded form through the service and renders the submission response.
pub async fn submit_form<R, S>(service: &IntakeService<R, S>, form: SubmissionForm) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    match service.submit(form).await {
        Ok(receipt) => {
            let mut payload = json!({
                "success": true,
                "message": SUBMISSION_ACCEPTED_MESSAGE,
                "applicationId": receipt.application_id,
                "data": receipt.record,
            });
            if !receipt.rejected_documents.is_empty() {
                payload["rejectedDocuments"] =
                    rejected_documents_payload(&receipt.rejected_documents);
            }
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => submission_error(err),
    }
}

async fn status_response<R, S>(service: &IntakeService<R, S>, id: ApplicationId) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    match service.status(&id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(IntakeError::NotFound) => not_found(),
        Err(other) => error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            Some(other.to_string()),
        ),
    }
}

pub(crate) async fn status_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    status_response(&service, ApplicationId(application_id.trim().to_string())).await
}

pub(crate) async fn lookup_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Query(query): Query<LookupQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    match query.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => status_response(&service, ApplicationId(id.trim().to_string())).await,
        None => error_body(
            StatusCode::BAD_REQUEST,
            "Missing application id",
            Some("Provide the id query parameter".to_string()),
        ),
    }
}

pub(crate) async fn list_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    match service.list().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => error_body(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), None),
    }
}

pub(crate) async fn review_handler<R, S>(
    State(service): State<Arc<IntakeService<R, S>>>,
    Path(application_id): Path<String>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    let ReviewBody { status, notes } = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                "Invalid request body",
                Some(rejection.body_text()),
            )
        }
    };

    let id = ApplicationId(application_id);
    match service.review(&id, ReviewRequest { status, notes }).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(IntakeError::NotFound) => not_found(),
        Err(err @ IntakeError::InvalidStatus(_)) => {
            error_body(StatusCode::BAD_REQUEST, "Invalid status", Some(err.to_string()))
        }
        Err(err) => error_body(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), None),
    }
}
