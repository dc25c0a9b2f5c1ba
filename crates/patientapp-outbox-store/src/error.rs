//! Mapping of `sqlx` failures into `DomainError`.

use patientapp_core::error::DomainError;

/// Converts storage errors into `DomainError::Infrastructure`, prefixed with
/// the operation that failed.
pub trait SqlxResultExt<T> {
    /// Maps the error side of a `sqlx` result.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when `self` is an error.
    fn map_infra(self, operation: &str) -> Result<T, DomainError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn map_infra(self, operation: &str) -> Result<T, DomainError> {
        self.map_err(|e| {
            tracing::error!(operation, error = %e, "Database operation failed");
            DomainError::Infrastructure(format!("{operation}: {e}"))
        })
    }
}

/// Returns `true` if `err` is a unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
