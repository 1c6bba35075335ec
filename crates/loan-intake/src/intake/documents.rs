use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{ApplicationId, DocumentSlot};
use super::validation::AcceptedDocument;

/// Object storage seam. Implementations must refuse to overwrite an existing key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Publicly retrievable address of an object. Does not check that the object exists.
    fn public_url(&self, key: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object already exists at '{0}'")]
    Conflict(String),
    #[error("storage rejected upload ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// `{applicationId}/{fieldName}_{submittedAtMillis}.{extension}`
pub fn storage_key(
    application_id: &ApplicationId,
    slot: DocumentSlot,
    submitted_at: DateTime<Utc>,
    extension: &str,
) -> String {
    format!(
        "{}/{}_{}.{}",
        application_id,
        slot.field_name(),
        submitted_at.timestamp_millis(),
        extension
    )
}

/// Namespaces uploads under their application and resolves the stored object's address.
pub struct DocumentStore<S> {
    objects: Arc<S>,
}

impl<S> Clone for DocumentStore<S> {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
        }
    }
}

impl<S> DocumentStore<S>
where
    S: ObjectStore + 'static,
{
    pub fn new(objects: Arc<S>) -> Self {
        Self { objects }
    }

    /// Upload one screened document and return its public address.
    pub async fn store(
        &self,
        application_id: &ApplicationId,
        document: AcceptedDocument,
        submitted_at: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let key = storage_key(
            application_id,
            document.slot,
            submitted_at,
            document.extension,
        );
        let size = document.bytes.len();

        self.objects
            .put(&key, document.bytes, document.content_type.essence_str())
            .await?;

        debug!(%application_id, slot = %document.slot, %key, size, "document stored");
        Ok(self.objects.public_url(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn storage_key_groups_documents_under_application() {
        let id = ApplicationId("0b6f3c1e-2f4e-4a36-9a57-6f1d7c1f2a10".to_string());
        let submitted_at = Utc
            .with_ymd_and_hms(2025, 1, 15, 9, 30, 0)
            .single()
            .expect("valid timestamp");

        let key = storage_key(&id, DocumentSlot::BankStatement, submitted_at, "pdf");

        assert_eq!(
            key,
            format!(
                "0b6f3c1e-2f4e-4a36-9a57-6f1d7c1f2a10/bankStatement_{}.pdf",
                submitted_at.timestamp_millis()
            )
        );
    }
}
