//! Test publishers — mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use patientapp_core::event::DomainEvent;
use patientapp_core::publisher::{EventPublisher, PublishError};
use uuid::Uuid;

/// What a publisher saw for one successful publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    /// Event identifier.
    pub event_id: Uuid,
    /// Event kind.
    pub event_type: String,
    /// Aggregate that raised the event.
    pub aggregate_id: Uuid,
    /// Correlation ID of the event.
    pub correlation_id: Uuid,
    /// Kind-specific payload.
    pub payload: serde_json::Value,
}

impl PublishedMessage {
    fn capture(event: &dyn DomainEvent) -> Result<Self, PublishError> {
        let meta = event.metadata();
        Ok(Self {
            event_id: meta.event_id,
            event_type: event.event_type().to_owned(),
            aggregate_id: meta.aggregate_id,
            correlation_id: meta.correlation_id,
            payload: event
                .to_payload()
                .map_err(|e| PublishError::Encoding(e.to_string()))?,
        })
    }
}

/// A publisher that accepts every event and records it.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    /// Creates a recording publisher with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every published message, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<(), PublishError> {
        let message = PublishedMessage::capture(event)?;
        self.published.lock().unwrap().push(message);
        Ok(())
    }
}

/// A publisher whose broker is always unreachable.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: &dyn DomainEvent) -> Result<(), PublishError> {
        Err(PublishError::Unavailable("connection refused".into()))
    }
}

/// A publisher that rejects events of the listed kinds and records the rest.
#[derive(Debug)]
pub struct FlakyPublisher {
    rejected_types: Vec<&'static str>,
    inner: RecordingPublisher,
    attempts: Mutex<usize>,
}

impl FlakyPublisher {
    /// Creates a publisher that rejects every event whose kind is in
    /// `rejected_types`.
    #[must_use]
    pub fn rejecting(rejected_types: Vec<&'static str>) -> Self {
        Self {
            rejected_types,
            inner: RecordingPublisher::new(),
            attempts: Mutex::new(0),
        }
    }

    /// Returns the messages that were accepted.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.inner.published()
    }

    /// Total publish calls, accepted or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl EventPublisher for FlakyPublisher {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<(), PublishError> {
        *self.attempts.lock().unwrap() += 1;
        if self.rejected_types.contains(&event.event_type()) {
            return Err(PublishError::Rejected(format!(
                "{} is not accepted",
                event.event_type()
            )));
        }
        self.inner.publish(event).await
    }
}

/// A publisher whose broker never confirms. Every publish stays pending
/// until the caller abandons it.
#[derive(Debug)]
pub struct StalledPublisher;

#[async_trait]
impl EventPublisher for StalledPublisher {
    async fn publish(&self, _event: &dyn DomainEvent) -> Result<(), PublishError> {
        std::future::pending().await
    }
}
