use thiserror::Error;

use crate::external::reading_source::SourceError;

/// Process-level errors: startup, scheduler plumbing, job failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Price check failed: {0}")]
    Cycle(#[from] CycleError),
    #[error("External error: {0}")]
    External(String),
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Why a single change cycle stopped before completing.
///
/// Notification failures are not here: they are logged and never abort a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),
    #[error("product name missing from page")]
    MissingProductName,
    #[error("price store unavailable: {0}")]
    Store(#[from] sqlx::Error),
}
