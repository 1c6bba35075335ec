use async_trait::async_trait;

use super::domain::{ApplicationId, ApplicationStatusView, LoanApplication, ReviewPatch};

/// Storage abstraction for application rows so the orchestrator can run against the
/// managed backend or an in-memory map.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Write one row. All-or-nothing; the stored representation is returned.
    async fn insert(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError>;
    /// Only the columns the public status endpoint exposes.
    async fn fetch_status(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationStatusView>, RepositoryError> {
        Ok(self.fetch(id).await?.map(|record| record.status_view()))
    }
    /// Every application, newest first.
    async fn list_recent(&self) -> Result<Vec<LoanApplication>, RepositoryError>;
    async fn apply_review(
        &self,
        id: &ApplicationId,
        patch: ReviewPatch,
    ) -> Result<LoanApplication, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected repository payload: {0}")]
    Decode(String),
}
