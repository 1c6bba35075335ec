use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::documents::{DocumentStore, ObjectStore};
use super::domain::{
    ApplicationId, ApplicationStatus, ApplicationStatusView, DocumentReferences, DocumentSlot,
    LoanApplication, ReviewPatch,
};
use super::repository::{ApplicationRepository, RepositoryError};
use super::validation::{
    screen_document, validate, AcceptedDocument, DocumentPart, DocumentRules, FileRejection,
    SubmissionForm, ValidationError,
};
use crate::config::{DocumentPolicy, IntakeConfig};

/// Orchestrates one submission end to end: validation, document uploads, and the row
/// insert. Also serves the status and admin review paths over the same repository.
pub struct IntakeService<R, S> {
    repository: Arc<R>,
    documents: DocumentStore<S>,
    config: IntakeConfig,
}

/// Successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub application_id: ApplicationId,
    pub record: LoanApplication,
    /// Documents dropped by screening under the isolate policy.
    pub rejected_documents: Vec<FileRejection>,
    /// Slots whose upload failed; their references are absent on the record.
    pub failed_uploads: Vec<DocumentSlot>,
}

/// Admin change request as received from the transport.
#[derive(Debug, Clone, Default)]
pub struct ReviewRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl<R, S> IntakeService<R, S>
where
    R: ApplicationRepository + 'static,
    S: ObjectStore + 'static,
{
    pub fn new(repository: Arc<R>, objects: Arc<S>, config: &IntakeConfig) -> Self {
        Self {
            repository,
            documents: DocumentStore::new(objects),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn document_rules(&self) -> DocumentRules {
        DocumentRules {
            max_bytes: self.config.max_document_bytes,
        }
    }

    /// Validate, upload, and persist one submission. Nothing is written when validation
    /// fails; upload failures only clear the affected reference.
    pub async fn submit(&self, form: SubmissionForm) -> Result<SubmissionReceipt, IntakeError> {
        let SubmissionForm { fields, documents } = form;

        let applicant = validate(&fields)?;
        let (accepted, rejected) = self.screen(documents);

        if self.config.document_policy == DocumentPolicy::Strict && !rejected.is_empty() {
            return Err(IntakeError::DocumentsRejected(rejected));
        }

        let application_id = ApplicationId::generate();
        let submitted_at = Utc::now();

        for rejection in &rejected {
            warn!(%application_id, slot = %rejection.slot(), %rejection, "document rejected");
        }

        let mut references = DocumentReferences::default();
        let mut failed_uploads = Vec::new();
        for document in accepted {
            let slot = document.slot;
            match self
                .documents
                .store(&application_id, document, submitted_at)
                .await
            {
                Ok(address) => references.set(slot, address),
                Err(err) => {
                    warn!(%application_id, %slot, error = %err, "document upload failed");
                    failed_uploads.push(slot);
                }
            }
        }

        let record = LoanApplication::new(
            application_id.clone(),
            applicant,
            references,
            submitted_at,
        );

        let stored = match self.repository.insert(record).await {
            Ok(stored) => stored,
            Err(err) => {
                error!(%application_id, error = %err, "application insert failed");
                return Err(IntakeError::Repository(err));
            }
        };

        info!(
            %application_id,
            loan_type = stored.applicant.loan_type.id(),
            rejected = rejected.len(),
            failed_uploads = failed_uploads.len(),
            "application submitted"
        );

        Ok(SubmissionReceipt {
            application_id,
            record: stored,
            rejected_documents: rejected,
            failed_uploads,
        })
    }

    /// Public status lookup. Identifiers that could never have been issued are reported as
    /// not found without touching the repository.
    pub async fn status(&self, id: &ApplicationId) -> Result<ApplicationStatusView, IntakeError> {
        if !id.is_well_formed() {
            return Err(IntakeError::NotFound);
        }

        self.repository
            .fetch_status(id)
            .await?
            .ok_or(IntakeError::NotFound)
    }

    /// All applications, newest first.
    pub async fn list(&self) -> Result<Vec<LoanApplication>, IntakeError> {
        Ok(self.repository.list_recent().await?)
    }

    /// Apply an admin status/notes change and refresh `updated_at`.
    pub async fn review(
        &self,
        id: &ApplicationId,
        request: ReviewRequest,
    ) -> Result<LoanApplication, IntakeError> {
        let status = match request.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                ApplicationStatus::parse(raw)
                    .ok_or_else(|| IntakeError::InvalidStatus(raw.to_string()))?,
            ),
        };

        if !id.is_well_formed() {
            return Err(IntakeError::NotFound);
        }

        let patch = ReviewPatch {
            status,
            admin_notes: request.notes,
            updated_at: Utc::now(),
        };

        match self.repository.apply_review(id, patch).await {
            Ok(record) => {
                info!(application_id = %id, status = record.status.label(), "application reviewed");
                Ok(record)
            }
            Err(RepositoryError::NotFound) => Err(IntakeError::NotFound),
            Err(err) => Err(IntakeError::Repository(err)),
        }
    }

    fn screen(
        &self,
        parts: Vec<DocumentPart>,
    ) -> (Vec<AcceptedDocument>, Vec<FileRejection>) {
        let rules = self.document_rules();
        let mut accepted: Vec<AcceptedDocument> = Vec::new();
        let mut rejected = Vec::new();

        for part in parts {
            // An empty part is an unselected file input.
            if part.bytes.is_empty() {
                continue;
            }
            if accepted.iter().any(|doc| doc.slot == part.slot)
                || rejected
                    .iter()
                    .any(|rejection: &FileRejection| rejection.slot() == part.slot)
            {
                continue;
            }
            match screen_document(part, &rules) {
                Ok(document) => accepted.push(document),
                Err(rejection) => rejected.push(rejection),
            }
        }

        (accepted, rejected)
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{} document(s) rejected", .0.len())]
    DocumentsRejected(Vec<FileRejection>),
    #[error("unknown application status '{0}'")]
    InvalidStatus(String),
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
