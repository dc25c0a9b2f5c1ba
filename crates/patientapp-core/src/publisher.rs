//! Message broker seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::event::DomainEvent;

/// Failure to hand an event to the broker.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker could not be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The broker refused the message.
    #[error("broker rejected message: {0}")]
    Rejected(String),

    /// The event could not be encoded for the wire.
    #[error("message encoding failed: {0}")]
    Encoding(String),
}

/// Publishes decoded domain events to the message bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event, resolving once the broker accepted it.
    async fn publish(&self, event: &dyn DomainEvent) -> Result<(), PublishError>;
}
