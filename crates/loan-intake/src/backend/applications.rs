use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{failure, BackendClient, BackendError};
use crate::intake::domain::{ApplicationId, ApplicationStatusView, LoanApplication, ReviewPatch};
use crate::intake::repository::{ApplicationRepository, RepositoryError};

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");
const STATUS_COLUMNS: &str = "id,full_name,loan_type,loan_amount,status,created_at";

/// Application rows stored behind the backend's REST table API.
#[derive(Clone)]
pub struct RestApplicationRepository {
    client: BackendClient,
    endpoint: String,
}

impl RestApplicationRepository {
    pub fn new(client: BackendClient) -> Self {
        let endpoint = client.rest_url(&client.config().applications_table);
        Self { client, endpoint }
    }

    /// Confirms the applications table is reachable with the configured key.
    #[instrument(name = "backend_probe_applications", skip(self))]
    pub async fn probe(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .http()
            .get(&self.endpoint)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        let (status, message) = failure(response).await;
        Err(BackendError::Status { status, message })
    }

    async fn rows<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Vec<T>, RepositoryError> {
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| RepositoryError::Decode(err.to_string()))
    }
}

fn unavailable(err: reqwest::Error) -> RepositoryError {
    RepositoryError::Unavailable(err.to_string())
}

async fn rejected(response: reqwest::Response) -> RepositoryError {
    let conflict = response.status() == StatusCode::CONFLICT;
    let (status, message) = failure(response).await;
    if conflict {
        debug!(%message, "backend reported duplicate row");
        RepositoryError::Conflict
    } else {
        RepositoryError::Backend { status, message }
    }
}

fn id_filter(id: &ApplicationId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

#[async_trait]
impl ApplicationRepository for RestApplicationRepository {
    #[instrument(name = "backend_insert_application", skip_all, fields(application_id = %record.id))]
    async fn insert(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let response = self
            .client
            .http()
            .post(&self.endpoint)
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&record)
            .send()
            .await
            .map_err(unavailable)?;

        Self::rows::<LoanApplication>(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Decode("insert returned no rows".to_string()))
    }

    #[instrument(name = "backend_fetch_application", skip(self))]
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let response = self
            .client
            .http()
            .get(&self.endpoint)
            .query(&[("select", "*".to_string()), id_filter(id)])
            .send()
            .await
            .map_err(unavailable)?;

        Ok(Self::rows::<LoanApplication>(response).await?.into_iter().next())
    }

    #[instrument(name = "backend_fetch_application_status", skip(self))]
    async fn fetch_status(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationStatusView>, RepositoryError> {
        let response = self
            .client
            .http()
            .get(&self.endpoint)
            .query(&[("select", STATUS_COLUMNS.to_string()), id_filter(id)])
            .send()
            .await
            .map_err(unavailable)?;

        Ok(Self::rows::<ApplicationStatusView>(response)
            .await?
            .into_iter()
            .next())
    }

    #[instrument(name = "backend_list_applications", skip(self))]
    async fn list_recent(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        let response = self
            .client
            .http()
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await
            .map_err(unavailable)?;

        Self::rows(response).await
    }

    #[instrument(name = "backend_review_application", skip(self, patch))]
    async fn apply_review(
        &self,
        id: &ApplicationId,
        patch: ReviewPatch,
    ) -> Result<LoanApplication, RepositoryError> {
        let response = self
            .client
            .http()
            .patch(&self.endpoint)
            .query(&[id_filter(id)])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&patch)
            .send()
            .await
            .map_err(unavailable)?;

        Self::rows::<LoanApplication>(response)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
    }
}
