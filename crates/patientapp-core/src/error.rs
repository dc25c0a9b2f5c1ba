//! Domain error types.
//!
//! Fallible operations return `Result<T, DomainError>`: a value or an error
//! description, never both and never neither. Expected failures (not found,
//! validation, conflicts, save failures) travel through this channel instead
//! of panicking.

use thiserror::Error;
use uuid::Uuid;

/// Convenience alias for results carrying a `DomainError`.
pub type DomainResult<T> = Result<T, DomainError>;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A lookup by a non-identifier key found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// A business rule rejected a duplicate.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// An event payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No decoder is registered for the event kind.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The outbox record was already marked processed.
    #[error("outbox record {0} is already processed")]
    AlreadyProcessed(Uuid),
}

impl DomainError {
    /// Returns `true` for failures that may succeed when retried unchanged
    /// (storage unavailable, optimistic conflicts).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Infrastructure(_) | Self::ConcurrencyConflict { .. }
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_errors_are_transient() {
        assert!(DomainError::Infrastructure("connection refused".into()).is_transient());
        assert!(
            DomainError::ConcurrencyConflict {
                aggregate_id: Uuid::new_v4(),
                expected: 1,
                actual: 2,
            }
            .is_transient()
        );
    }

    #[test]
    fn test_business_rule_errors_are_not_transient() {
        assert!(!DomainError::Validation("bad input".into()).is_transient());
        assert!(!DomainError::Conflict("duplicate".into()).is_transient());
        assert!(!DomainError::NotFound("patient".into()).is_transient());
        assert!(!DomainError::UnknownEventType("x".into()).is_transient());
    }

    #[test]
    fn test_serde_json_error_maps_to_serialization() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();

        match DomainError::from(err) {
            DomainError::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Serialization, got {other:?}"),
        }
    }
}
