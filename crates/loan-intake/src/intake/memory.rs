//! Process-local backends used by tests, the CLI demo, and servers started without a
//! configured backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::documents::{ObjectStore, StorageError};
use super::domain::{ApplicationId, LoanApplication, ReviewPatch};
use super::repository::{ApplicationRepository, RepositoryError};

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, LoanApplication>>>,
}

impl InMemoryApplicationRepository {
    pub fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("repository mutex poisoned".to_string())
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert(&self, record: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    async fn list_recent(&self) -> Result<Vec<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        let mut records: Vec<LoanApplication> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn apply_review(
        &self,
        id: &ApplicationId,
        patch: ReviewPatch,
    ) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.apply_review(&patch);
        Ok(record.clone())
    }
}

/// Object bytes with the content type they were uploaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::with_base_url("memory://documents")
    }
}

impl InMemoryObjectStore {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Keys currently stored, in lexical order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("object store mutex poisoned".to_string()))?;
        if guard.contains_key(key) {
            return Err(StorageError::Conflict(key.to_string()));
        }
        guard.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}
