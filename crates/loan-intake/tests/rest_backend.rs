use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use loan_intake::backend::{BackendClient, BucketState, RestApplicationRepository, RestObjectStore};
use loan_intake::config::{BackendConfig, IntakeConfig};
use loan_intake::intake::{
    ApplicationId, ApplicationRepository, ApplicationStatus, DocumentPart, DocumentSlot,
    IntakeService, ObjectStore, RepositoryError, ReviewRequest, StorageError, SubmissionForm,
};
use serde_json::{json, Map, Value};

const SERVICE_KEY: &str = "test-service-key";

#[derive(Default)]
struct FakeBackend {
    rows: Vec<Map<String, Value>>,
    objects: BTreeMap<String, (String, usize)>,
    buckets: Vec<String>,
}

type Shared = Arc<Mutex<FakeBackend>>;

fn authorized(headers: &HeaderMap) -> bool {
    let key = headers.get("apikey").and_then(|value| value.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    key == Some(SERVICE_KEY) && bearer == Some("Bearer test-service-key")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid API key" })),
    )
        .into_response()
}

fn id_matches(row: &Map<String, Value>, query: &HashMap<String, String>) -> bool {
    match query.get("id").and_then(|filter| filter.strip_prefix("eq.")) {
        Some(id) => row.get("id").and_then(Value::as_str) == Some(id),
        None => true,
    }
}

async fn insert_row(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(row): Json<Map<String, Value>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if row.get("email").map_or(true, Value::is_null) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": "23502", "message": "null value in column \"email\"" })),
        )
            .into_response();
    }
    let mut guard = state.lock().expect("fake backend lock");
    guard.rows.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn select_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let guard = state.lock().expect("fake backend lock");
    let mut rows: Vec<Map<String, Value>> = guard
        .rows
        .iter()
        .filter(|row| id_matches(row, &query))
        .cloned()
        .collect();
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.sort_by(|a, b| {
            let created = |row: &Map<String, Value>| {
                row.get("created_at")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            created(b).cmp(&created(a))
        });
    }
    if let Some(limit) = query.get("limit").and_then(|raw| raw.parse::<usize>().ok()) {
        rows.truncate(limit);
    }
    if let Some(columns) = query.get("select").filter(|select| select.as_str() != "*") {
        let columns: Vec<&str> = columns.split(',').collect();
        for row in &mut rows {
            row.retain(|column, _| columns.contains(&column.as_str()));
        }
    }
    Json(rows).into_response()
}

async fn update_rows(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(changes): Json<Map<String, Value>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut guard = state.lock().expect("fake backend lock");
    let mut updated = Vec::new();
    for row in guard.rows.iter_mut().filter(|row| id_matches(row, &query)) {
        for (column, value) in &changes {
            row.insert(column.clone(), value.clone());
        }
        updated.push(row.clone());
    }
    Json(updated).into_response()
}

async fn get_bucket(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let guard = state.lock().expect("fake backend lock");
    if guard.buckets.contains(&name) {
        Json(json!({ "id": name, "public": true })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "statusCode": "404", "error": "Bucket not found", "message": "Bucket not found" })),
        )
            .into_response()
    }
}

async fn create_bucket(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    assert_eq!(body["public"], Value::Bool(true));
    let name = body["name"].as_str().unwrap_or_default().to_string();
    state.lock().expect("fake backend lock").buckets.push(name.clone());
    Json(json!({ "name": name })).into_response()
}

async fn put_object(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((bucket, key)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    assert_eq!(
        headers.get("x-upsert").and_then(|value| value.to_str().ok()),
        Some("false")
    );
    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let path = format!("{bucket}/{key}");
    let mut guard = state.lock().expect("fake backend lock");
    if guard.objects.contains_key(&path) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "statusCode": "409", "error": "Duplicate", "message": "The resource already exists" })),
        )
            .into_response();
    }
    guard.objects.insert(path.clone(), (content_type, body.len()));
    Json(json!({ "Key": path })).into_response()
}

async fn spawn_fake_backend() -> (SocketAddr, Shared) {
    let state: Shared = Arc::new(Mutex::new(FakeBackend::default()));
    let app = Router::new()
        .route(
            "/rest/v1/loan_applications",
            post(insert_row).get(select_rows).patch(update_rows),
        )
        .route("/storage/v1/bucket/:name", get(get_bucket))
        .route("/storage/v1/bucket", post(create_bucket))
        .route("/storage/v1/object/:bucket/*key", post(put_object))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend runs");
    });
    (addr, state)
}

fn backend_config(addr: SocketAddr, service_key: &str) -> BackendConfig {
    BackendConfig {
        base_url: format!("http://{addr}"),
        service_key: service_key.to_string(),
        applications_table: "loan_applications".to_string(),
        documents_bucket: "documents".to_string(),
        request_timeout: Duration::from_secs(5),
    }
}

fn adapters(config: &BackendConfig) -> (RestApplicationRepository, RestObjectStore) {
    let client = BackendClient::new(config).expect("client builds");
    (
        RestApplicationRepository::new(client.clone()),
        RestObjectStore::new(client),
    )
}

fn applicant_form() -> SubmissionForm {
    SubmissionForm::default()
        .field("fullName", "Asha Rao")
        .field("email", "asha@example.com")
        .field("phone", "9876543210")
        .field("loanType", "home")
        .field("loanAmount", "2500000")
        .field("employmentType", "salaried")
}

#[tokio::test]
async fn submission_round_trips_through_the_rest_backend() {
    let (addr, state) = spawn_fake_backend().await;
    let config = backend_config(addr, SERVICE_KEY);
    let (repository, objects) = adapters(&config);

    assert_eq!(
        objects.ensure_bucket().await.expect("bucket created"),
        BucketState::Created
    );
    assert_eq!(
        objects.ensure_bucket().await.expect("bucket exists"),
        BucketState::Existing
    );
    repository.probe().await.expect("table reachable");

    let service = IntakeService::new(
        Arc::new(repository),
        Arc::new(objects),
        &IntakeConfig::default(),
    );
    let form = applicant_form().document(DocumentPart {
        slot: DocumentSlot::Itr,
        file_name: Some("itr.pdf".to_string()),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.7 income tax return".to_vec(),
    });

    let receipt = service.submit(form).await.expect("submission succeeds");

    let itr_url = receipt
        .record
        .documents
        .itr_url
        .clone()
        .expect("itr address");
    let prefix = format!(
        "http://{addr}/storage/v1/object/public/documents/{}/itr_",
        receipt.application_id
    );
    assert!(itr_url.starts_with(&prefix), "unexpected address {itr_url}");
    {
        let guard = state.lock().expect("fake backend lock");
        assert_eq!(guard.rows.len(), 1);
        assert_eq!(guard.rows[0]["status"], "pending");
        assert_eq!(guard.rows[0]["whatsapp"], "9876543210");
        assert_eq!(guard.rows[0]["employment_type"], "salaried");
        let (content_type, size) = guard.objects.values().next().expect("object stored");
        assert_eq!(content_type, "application/pdf");
        assert_eq!(*size, 26);
    }

    let view = service
        .status(&receipt.application_id)
        .await
        .expect("status found");
    assert_eq!(view.status, ApplicationStatus::Pending);

    let reviewed = service
        .review(
            &receipt.application_id,
            ReviewRequest {
                status: Some("approved".to_string()),
                notes: Some("verified".to_string()),
            },
        )
        .await
        .expect("review succeeds");
    assert_eq!(reviewed.status, ApplicationStatus::Approved);
    assert_eq!(reviewed.admin_notes.as_deref(), Some("verified"));
    assert!(reviewed.updated_at.is_some());

    let listed = service.list().await.expect("list succeeds");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ApplicationStatus::Approved);

    let missing = service
        .review(
            &ApplicationId::generate(),
            ReviewRequest {
                status: Some("rejected".to_string()),
                notes: None,
            },
        )
        .await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn storage_refuses_to_overwrite_objects() {
    let (addr, _) = spawn_fake_backend().await;
    let (_, objects) = adapters(&backend_config(addr, SERVICE_KEY));

    objects
        .put("app-1/panCard_1.pdf", b"first".to_vec(), "application/pdf")
        .await
        .expect("first upload");
    let err = objects
        .put("app-1/panCard_1.pdf", b"second".to_vec(), "application/pdf")
        .await
        .expect_err("second upload rejected");

    assert!(matches!(err, StorageError::Conflict(ref key) if key == "app-1/panCard_1.pdf"));
}

#[tokio::test]
async fn provider_errors_carry_the_backend_message() {
    let (addr, _) = spawn_fake_backend().await;

    let (repository, _) = adapters(&backend_config(addr, "wrong-key"));
    let err = repository
        .list_recent()
        .await
        .expect_err("unauthorized");
    assert!(matches!(
        err,
        RepositoryError::Backend { status: 401, ref message } if message == "Invalid API key"
    ));
    assert!(repository.probe().await.is_err());
}

#[tokio::test]
async fn unreachable_backend_is_reported_as_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let (repository, objects) = adapters(&backend_config(addr, SERVICE_KEY));

    assert!(matches!(
        repository.fetch(&ApplicationId::generate()).await,
        Err(RepositoryError::Unavailable(_))
    ));
    assert!(matches!(
        objects
            .put("app-1/itr_1.pdf", b"x".to_vec(), "application/pdf")
            .await,
        Err(StorageError::Unavailable(_))
    ));
}

fn stored_row(id: &str, status: &str, created_at: &str) -> Map<String, Value> {
    let row = json!({
        "id": id,
        "full_name": "Ravi Kumar",
        "email": "ravi@example.com",
        "phone": "9123456780",
        "whatsapp": "9123456780",
        "loan_type": "car",
        "loan_amount": 800000,
        "status": status,
        "created_at": created_at,
        "referral_source": "walk-in",
        "pan_card_url": null,
    });
    match row {
        Value::Object(map) => map,
        _ => unreachable!("row literal is an object"),
    }
}

#[tokio::test]
async fn rows_written_by_other_tools_still_decode() {
    let (addr, state) = spawn_fake_backend().await;
    let (repository, objects) = adapters(&backend_config(addr, SERVICE_KEY));
    let spaced = ApplicationId::generate();
    let escalated = ApplicationId::generate();
    {
        let mut guard = state.lock().expect("fake backend lock");
        guard
            .rows
            .push(stored_row(spaced.as_str(), "in review", "2024-03-01T10:00:00Z"));
        guard
            .rows
            .push(stored_row(escalated.as_str(), "escalated", "2024-03-02T10:00:00Z"));
    }
    let service = IntakeService::new(
        Arc::new(repository),
        Arc::new(objects),
        &IntakeConfig::default(),
    );

    let listed = service.list().await.expect("admin list succeeds");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, escalated);
    assert_eq!(
        listed[0].status,
        ApplicationStatus::Other("escalated".to_string())
    );
    assert_eq!(listed[1].status, ApplicationStatus::InReview);

    let view = service.status(&spaced).await.expect("status found");
    assert_eq!(view.status, ApplicationStatus::InReview);
    assert_eq!(view.full_name, "Ravi Kumar");
    let view = service.status(&escalated).await.expect("status found");
    assert_eq!(view.status.label(), "escalated");
}
