//! `EventPublisher` backed by NATS JetStream.
//!
//! Each event goes to `{prefix}.{event_type}` as a JSON envelope of its
//! metadata and payload. The event id is sent as the JetStream message id,
//! so a record republished after a missed mark is dropped by the stream's
//! duplicate window.

use async_nats::HeaderMap;
use async_nats::jetstream;
use async_trait::async_trait;
use patientapp_core::event::{DomainEvent, EventMetadata};
use patientapp_core::publisher::{EventPublisher, PublishError};
use serde::Serialize;
use tracing::debug;

const MESSAGE_ID_HEADER: &str = "Nats-Msg-Id";
const CORRELATION_ID_HEADER: &str = "Correlation-Id";

/// Wire format of a published event.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    metadata: &'a EventMetadata,
    payload: serde_json::Value,
}

/// Builds the subject an event kind is published on.
#[must_use]
pub fn subject_for(prefix: &str, event_type: &str) -> String {
    format!("{prefix}.{event_type}")
}

/// Encodes an event as its JSON wire envelope.
///
/// # Errors
///
/// Returns `PublishError::Encoding` if the payload cannot be serialized.
pub fn encode(event: &dyn DomainEvent) -> Result<Vec<u8>, PublishError> {
    let payload = event
        .to_payload()
        .map_err(|e| PublishError::Encoding(e.to_string()))?;
    serde_json::to_vec(&Envelope {
        metadata: event.metadata(),
        payload,
    })
    .map_err(|e| PublishError::Encoding(e.to_string()))
}

/// Publishes events to JetStream and waits for the stream's ack.
#[derive(Debug, Clone)]
pub struct NatsEventPublisher {
    jetstream: jetstream::Context,
    subject_prefix: String,
}

impl NatsEventPublisher {
    /// Creates a publisher on `client` using `subject_prefix`.
    #[must_use]
    pub fn new(client: async_nats::Client, subject_prefix: impl Into<String>) -> Self {
        Self {
            jetstream: jetstream::new(client),
            subject_prefix: subject_prefix.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<(), PublishError> {
        let subject = subject_for(&self.subject_prefix, event.event_type());
        let body = encode(event)?;
        let meta = event.metadata();

        let mut headers = HeaderMap::new();
        headers.insert(MESSAGE_ID_HEADER, meta.event_id.to_string().as_str());
        headers.insert(CORRELATION_ID_HEADER, meta.correlation_id.to_string().as_str());

        let ack = self
            .jetstream
            .publish_with_headers(subject.clone(), headers, body.into())
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))?
            .await
            .map_err(|e| PublishError::Rejected(e.to_string()))?;

        debug!(
            subject = %subject,
            stream = %ack.stream,
            stream_sequence = ack.sequence,
            duplicate = ack.duplicate,
            "event acknowledged by JetStream"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use patientapp_core::error::DomainError;
    use uuid::Uuid;

    use super::*;

    #[derive(Debug)]
    struct Registered {
        metadata: EventMetadata,
        payload: serde_json::Value,
    }

    impl DomainEvent for Registered {
        fn event_type(&self) -> &'static str {
            "patient.registered"
        }

        fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
            Ok(self.payload.clone())
        }

        fn metadata(&self) -> &EventMetadata {
            &self.metadata
        }
    }

    fn registered() -> Registered {
        Registered {
            metadata: EventMetadata {
                event_id: Uuid::now_v7(),
                event_type: "patient.registered".to_owned(),
                aggregate_id: Uuid::new_v4(),
                sequence_number: 1,
                correlation_id: Uuid::new_v4(),
                causation_id: Uuid::new_v4(),
                occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            },
            payload: serde_json::json!({"email": "jane@example.com"}),
        }
    }

    #[test]
    fn test_subject_joins_prefix_and_event_type() {
        assert_eq!(
            subject_for("patient.events", "patient.registered"),
            "patient.events.patient.registered"
        );
    }

    #[test]
    fn test_encode_flattens_metadata_next_to_payload() {
        // Arrange
        let event = registered();

        // Act
        let body = encode(&event).unwrap();

        // Assert
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["event_id"], event.metadata.event_id.to_string());
        assert_eq!(json["event_type"], "patient.registered");
        assert_eq!(json["aggregate_id"], event.metadata.aggregate_id.to_string());
        assert_eq!(json["sequence_number"], 1);
        assert_eq!(
            json["correlation_id"],
            event.metadata.correlation_id.to_string()
        );
        assert_eq!(json["payload"]["email"], "jane@example.com");
    }
}
