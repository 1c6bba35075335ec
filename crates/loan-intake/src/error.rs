use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;

/// Process-level failures surfaced by the CLI entry points.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
