//! Explicit correlation context.
//!
//! Correlation identifiers are passed into domain methods, the commit hook,
//! and the dispatcher instead of being read from ambient state.

use uuid::Uuid;

/// Correlation identifiers for one business operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationContext {
    /// Traces a request through every effect it produces.
    pub correlation_id: Uuid,
    /// The command or event that directly caused the current work.
    pub causation_id: Uuid,
}

impl CorrelationContext {
    /// Starts a new correlation chain where the cause is the request itself.
    #[must_use]
    pub fn new(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            causation_id: correlation_id,
        }
    }

    /// Starts a fresh chain with a random correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Derives a context for work caused by `causation_id` within the same chain.
    #[must_use]
    pub fn caused_by(&self, causation_id: Uuid) -> Self {
        Self {
            correlation_id: self.correlation_id,
            causation_id,
        }
    }
}
