use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub backend: Option<BackendConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let intake = IntakeConfig::from_env()?;
        let backend = BackendConfig::from_env()?;

        if backend.is_none() && environment == AppEnvironment::Production {
            return Err(ConfigError::MissingBackend);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake,
            backend,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// How a rejected document affects the rest of its submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentPolicy {
    /// Drop the offending document and keep processing the submission.
    #[default]
    Isolate,
    /// Reject the whole submission before anything is written.
    Strict,
}

impl DocumentPolicy {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "isolate" | "per-field" => Ok(Self::Isolate),
            "strict" | "reject" => Ok(Self::Strict),
            other => Err(ConfigError::InvalidDocumentPolicy(other.to_string())),
        }
    }
}

/// Limits applied to multipart submissions.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub max_document_bytes: usize,
    pub document_policy: DocumentPolicy,
}

impl IntakeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_document_bytes = match env::var("APP_MAX_DOCUMENT_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidDocumentLimit)?,
            Err(_) => DEFAULT_MAX_DOCUMENT_BYTES,
        };

        let document_policy = match env::var("APP_DOCUMENT_POLICY") {
            Ok(raw) => DocumentPolicy::parse(&raw)?,
            Err(_) => DocumentPolicy::default(),
        };

        Ok(Self {
            max_document_bytes,
            document_policy,
        })
    }

    /// Upper bound for a whole multipart body: four documents plus the text fields.
    pub fn body_limit(&self) -> usize {
        self.max_document_bytes
            .saturating_mul(4)
            .saturating_add(1024 * 1024)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            document_policy: DocumentPolicy::default(),
        }
    }
}

/// Connection settings for the managed database/storage backend.
#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub service_key: String,
    pub applications_table: String,
    pub documents_bucket: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let base_url = match env::var("APP_BACKEND_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => return Ok(None),
        };

        let service_key = env::var("APP_BACKEND_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingBackendKey)?;

        let applications_table = env::var("APP_APPLICATIONS_TABLE")
            .unwrap_or_else(|_| "loan_applications".to_string());
        let documents_bucket =
            env::var("APP_DOCUMENTS_BUCKET").unwrap_or_else(|_| "documents".to_string());

        let timeout_secs = env::var("APP_BACKEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        Ok(Some(Self {
            base_url,
            service_key: service_key.trim().to_string(),
            applications_table,
            documents_bucket,
            request_timeout: Duration::from_secs(timeout_secs),
        }))
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .field("applications_table", &self.applications_table)
            .field("documents_bucket", &self.documents_bucket)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDocumentLimit,
    InvalidDocumentPolicy(String),
    InvalidTimeout,
    MissingBackendKey,
    MissingBackend,
    BackendNotConfigured,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDocumentLimit => {
                write!(f, "APP_MAX_DOCUMENT_BYTES must be a positive integer")
            }
            ConfigError::InvalidDocumentPolicy(value) => write!(
                f,
                "APP_DOCUMENT_POLICY must be 'isolate' or 'strict' (found '{value}')"
            ),
            ConfigError::InvalidTimeout => {
                write!(f, "APP_BACKEND_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::MissingBackendKey => {
                write!(f, "APP_BACKEND_KEY is required when APP_BACKEND_URL is set")
            }
            ConfigError::MissingBackend => {
                write!(f, "APP_BACKEND_URL must be configured in production")
            }
            ConfigError::BackendNotConfigured => write!(f, "APP_BACKEND_URL is not set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
