//! Patient App — dispatcher error types.

use patientapp_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the dispatcher process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The message broker could not be reached.
    #[error("broker error: {0}")]
    Broker(String),
}

/// Failure that aborts one dispatch cycle. Per-record failures never do.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Unprocessed records could not be read.
    #[error("failed to fetch unprocessed outbox records: {0}")]
    Fetch(#[source] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_keeps_source() {
        let err = DispatchError::Fetch(DomainError::Infrastructure("db down".into()));

        let source = std::error::Error::source(&err).map(ToString::to_string);

        assert_eq!(source.as_deref(), Some("infrastructure error: db down"));
        assert!(err.to_string().contains("db down"));
    }

    #[test]
    fn test_config_error_message() {
        let err = AppError::Config("DATABASE_URL must be set".into());

        assert_eq!(
            err.to_string(),
            "configuration error: DATABASE_URL must be set"
        );
    }
}
