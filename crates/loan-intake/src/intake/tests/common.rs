use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::config::{DocumentPolicy, IntakeConfig};
use crate::intake::documents::{ObjectStore, StorageError};
use crate::intake::domain::{ApplicationId, DocumentSlot, LoanApplication, ReviewPatch};
use crate::intake::memory::{InMemoryApplicationRepository, InMemoryObjectStore};
use crate::intake::repository::{ApplicationRepository, RepositoryError};
use crate::intake::service::IntakeService;
use crate::intake::validation::{DocumentPart, SubmissionForm};

pub(super) const BOUNDARY: &str = "loan-intake-test-boundary";

pub(super) type MemoryService = IntakeService<InMemoryApplicationRepository, InMemoryObjectStore>;

pub(super) fn intake_config(max_document_bytes: usize, policy: DocumentPolicy) -> IntakeConfig {
    IntakeConfig {
        max_document_bytes,
        document_policy: policy,
    }
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryApplicationRepository>,
    Arc<InMemoryObjectStore>,
) {
    build_service_with(&IntakeConfig::default())
}

pub(super) fn build_service_with(
    config: &IntakeConfig,
) -> (
    MemoryService,
    Arc<InMemoryApplicationRepository>,
    Arc<InMemoryObjectStore>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let objects = Arc::new(InMemoryObjectStore::with_base_url(
        "https://storage.test/documents",
    ));
    let service = IntakeService::new(repository.clone(), objects.clone(), config);
    (service, repository, objects)
}

pub(super) const APPLICANT_FIELDS: [(&str, &str); 5] = [
    ("fullName", "Asha Rao"),
    ("email", "asha@example.com"),
    ("phone", "9876543210"),
    ("loanType", "personal"),
    ("loanAmount", "500000"),
];

pub(super) fn applicant_form() -> SubmissionForm {
    APPLICANT_FIELDS
        .into_iter()
        .fold(SubmissionForm::default(), |form, (name, value)| {
            form.field(name, value)
        })
}

pub(super) fn pdf_part(slot: DocumentSlot) -> DocumentPart {
    DocumentPart {
        slot,
        file_name: Some(format!("{}.pdf", slot.field_name())),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.4 test document".to_vec(),
    }
}

pub(super) fn part(
    slot: DocumentSlot,
    file_name: &str,
    content_type: &str,
    size: usize,
) -> DocumentPart {
    DocumentPart {
        slot,
        file_name: Some(file_name.to_string()),
        content_type: Some(content_type.to_string()),
        bytes: vec![b'x'; size],
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl ApplicationRepository for UnavailableRepository {
    async fn insert(&self, _record: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        Err(RepositoryError::Backend {
            status: 503,
            message: "database offline".to_string(),
        })
    }

    async fn fetch(&self, _id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn list_recent(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn apply_review(
        &self,
        _id: &ApplicationId,
        _patch: ReviewPatch,
    ) -> Result<LoanApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Accepts nothing; every upload fails.
pub(super) struct FailingObjectStore;

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn put(
        &self,
        _key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("bucket offline".to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://storage.test/documents/{key}")
    }
}

/// A text field or a file part in a hand-built multipart body.
pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    },
}

pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn applicant_parts() -> Vec<Part<'static>> {
    APPLICANT_FIELDS
        .into_iter()
        .map(|(name, value)| Part::Text(name, value))
        .collect()
}

pub(super) fn submission_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::post("/api/applications")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
