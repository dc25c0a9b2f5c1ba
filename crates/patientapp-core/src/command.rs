//! Command abstractions.

use crate::context::CorrelationContext;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation identifiers to trace this command through the system.
    fn context(&self) -> CorrelationContext;
}
