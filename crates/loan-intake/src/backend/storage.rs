use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::json;
use tracing::{info, instrument};

use super::{failure, BackendClient, BackendError};
use crate::intake::documents::{ObjectStore, StorageError};

/// Outcome of [`RestObjectStore::ensure_bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Existing,
    Created,
}

/// Documents stored in a public bucket of the backend's object storage API.
#[derive(Clone)]
pub struct RestObjectStore {
    client: BackendClient,
    bucket: String,
}

impl RestObjectStore {
    pub fn new(client: BackendClient) -> Self {
        let bucket = client.config().documents_bucket.clone();
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the documents bucket as public when it does not exist yet.
    #[instrument(name = "backend_ensure_bucket", skip(self), fields(bucket = %self.bucket))]
    pub async fn ensure_bucket(&self) -> Result<BucketState, BackendError> {
        let response = self
            .client
            .http()
            .get(self.client.storage_url(&format!("bucket/{}", self.bucket)))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(BucketState::Existing);
        }

        // Missing buckets surface as 404, or as 400 with a not-found message.
        let (status, message) = failure(response).await;
        let missing = status == StatusCode::NOT_FOUND.as_u16()
            || message.to_ascii_lowercase().contains("not found");
        if !missing {
            return Err(BackendError::Status { status, message });
        }

        let response = self
            .client
            .http()
            .post(self.client.storage_url("bucket"))
            .json(&json!({ "id": self.bucket, "name": self.bucket, "public": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = failure(response).await;
            return Err(BackendError::Status { status, message });
        }

        info!("created public documents bucket");
        Ok(BucketState::Created)
    }
}

fn is_duplicate(status: u16, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    status == StatusCode::CONFLICT.as_u16()
        || message.contains("duplicate")
        || message.contains("already exists")
}

#[async_trait]
impl ObjectStore for RestObjectStore {
    #[instrument(name = "backend_put_object", skip(self, bytes), fields(size = bytes.len()))]
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .http()
            .post(
                self.client
                    .storage_url(&format!("object/{}/{}", self.bucket, key)),
            )
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|err| StorageError::Unavailable(err.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        let (status, message) = failure(response).await;
        if is_duplicate(status, &message) {
            return Err(StorageError::Conflict(key.to_string()));
        }
        Err(StorageError::Backend { status, message })
    }

    fn public_url(&self, key: &str) -> String {
        self.client
            .storage_url(&format!("object/public/{}/{}", self.bucket, key))
    }
}
