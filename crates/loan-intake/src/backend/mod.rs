//! HTTP adapters for the managed backend: a PostgREST-style row API for application records
//! and an object storage API for uploaded documents. Both share one [`BackendClient`], which
//! carries the service key on every request.

mod applications;
mod storage;

pub use applications::RestApplicationRepository;
pub use storage::{BucketState, RestObjectStore};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use crate::config::BackendConfig;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid backend url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("service key is not a valid header value")]
    InvalidKey,
    #[error("http client setup failed: {0}")]
    Client(String),
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Shared HTTP client bound to one backend project.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let parsed = reqwest::Url::parse(&config.base_url).map_err(|err| BackendError::InvalidUrl {
            url: config.base_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl {
                url: config.base_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(auth_headers(&config.service_key)?)
            .build()
            .map_err(|err| BackendError::Client(err.to_string()))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    pub(crate) fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.config.base_url, path)
    }
}

fn auth_headers(service_key: &str) -> Result<HeaderMap, BackendError> {
    let mut headers = HeaderMap::new();
    let mut key = HeaderValue::from_str(service_key).map_err(|_| BackendError::InvalidKey)?;
    key.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
        .map_err(|_| BackendError::InvalidKey)?;
    bearer.set_sensitive(true);
    headers.insert(HeaderName::from_static("apikey"), key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

/// Status code and the most specific message the provider put in an error body.
pub(crate) async fn failure(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status.as_u16(), provider_message(status.as_u16(), &body))
}

pub(crate) fn provider_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error_description", "error", "msg"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("backend responded with status {status}")
    } else {
        trimmed.to_string()
    }
}
