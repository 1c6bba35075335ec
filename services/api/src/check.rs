use loan_intake::backend::BucketState;
use loan_intake::config::{AppConfig, ConfigError};
use loan_intake::error::AppError;
use loan_intake::telemetry;

use crate::infra::rest_backend;

/// Probe the applications table and make sure the public documents bucket exists.
pub(crate) async fn run_check() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let backend = config
        .backend
        .as_ref()
        .ok_or(ConfigError::BackendNotConfigured)?;
    let (repository, objects) = rest_backend(backend)?;

    println!("Backend: {}", backend.base_url);

    repository.probe().await?;
    println!("  table '{}' reachable", backend.applications_table);

    match objects.ensure_bucket().await? {
        BucketState::Existing => println!("  bucket '{}' present", objects.bucket()),
        BucketState::Created => println!("  bucket '{}' created (public)", objects.bucket()),
    }

    Ok(())
}
