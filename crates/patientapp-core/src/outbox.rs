//! Outbox records and the storage seam the dispatcher reads them through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::event::{DomainEvent, EventMetadata};

/// Durable, serialized projection of one domain event.
///
/// Created only by the unit-of-work commit hook. Immutable apart from the
/// processed flag and timestamp, which move from unset to set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    /// Time-ordered identifier, equal to the source event id.
    pub id: Uuid,
    /// Type of the aggregate that raised the event.
    pub aggregate_type: String,
    /// Aggregate that raised the event.
    pub aggregate_id: Uuid,
    /// Event kind, used to look up a decoder at dispatch time.
    pub event_type: String,
    /// Kind-specific event fields.
    pub payload: serde_json::Value,
    /// Sequence number of the event within its aggregate.
    pub sequence_number: i64,
    /// Correlation ID carried over from the event.
    pub correlation_id: Uuid,
    /// Causation ID carried over from the event.
    pub causation_id: Uuid,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Whether the record has been published.
    pub processed: bool,
    /// When the record was marked processed. Set iff `processed` is true.
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    /// Projects a domain event into a new, unprocessed outbox record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the event payload cannot be
    /// encoded.
    pub fn from_event<E: DomainEvent + ?Sized>(
        aggregate_type: &str,
        event: &E,
    ) -> DomainResult<Self> {
        let meta = event.metadata();
        Ok(Self {
            id: meta.event_id,
            aggregate_type: aggregate_type.to_owned(),
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload()?,
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            causation_id: meta.causation_id,
            occurred_at: meta.occurred_at,
            processed: false,
            processed_at: None,
        })
    }

    /// Returns `true` once the record has been published and marked.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Rebuilds the metadata of the event this record was projected from.
    #[must_use]
    pub fn event_metadata(&self) -> EventMetadata {
        EventMetadata {
            event_id: self.id,
            event_type: self.event_type.clone(),
            aggregate_id: self.aggregate_id,
            sequence_number: self.sequence_number,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            occurred_at: self.occurred_at,
        }
    }

    /// Marks the record processed at `at`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AlreadyProcessed` if the record was already
    /// marked; the original timestamp is kept.
    pub fn mark_processed(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.processed {
            return Err(DomainError::AlreadyProcessed(self.id));
        }
        self.processed = true;
        self.processed_at = Some(at);
        Ok(())
    }
}

/// Storage collaborator used by the outbox dispatcher.
///
/// Producers only insert records (through a unit of work); the single
/// dispatcher only reads them and flips the processed flag.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Fetches up to `limit` unprocessed records, oldest first
    /// (`occurred_at`, then `id`).
    async fn fetch_unprocessed(&self, limit: u32) -> DomainResult<Vec<OutboxRecord>>;

    /// Marks one record processed in its own committed write.
    ///
    /// Returns `DomainError::AlreadyProcessed` if the record was already
    /// marked and `DomainError::AggregateNotFound` if no such record exists.
    async fn mark_processed(
        &self,
        id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    /// Deletes processed records whose `processed_at` is older than `cutoff`.
    /// Unprocessed records are never deleted. Returns the number removed.
    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::Serialize;

    use super::*;
    use crate::clock::Clock;
    use crate::context::CorrelationContext;

    #[derive(Debug, Serialize)]
    struct NoteAdded {
        text: String,
    }

    #[derive(Debug)]
    struct NoteEvent {
        metadata: EventMetadata,
        body: NoteAdded,
    }

    impl DomainEvent for NoteEvent {
        fn event_type(&self) -> &'static str {
            "note.added"
        }

        fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
            Ok(serde_json::to_value(&self.body)?)
        }

        fn metadata(&self) -> &EventMetadata {
            &self.metadata
        }
    }

    struct StaticClock;

    impl Clock for StaticClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
        }
    }

    fn note_event() -> NoteEvent {
        let ctx = CorrelationContext::new(Uuid::new_v4());
        NoteEvent {
            metadata: EventMetadata::new("note.added", Uuid::new_v4(), 1, &ctx, &StaticClock),
            body: NoteAdded {
                text: "hello".to_owned(),
            },
        }
    }

    #[test]
    fn test_from_event_builds_unprocessed_record() {
        // Arrange
        let event = note_event();

        // Act
        let record = OutboxRecord::from_event("note", &event).unwrap();

        // Assert
        assert_eq!(record.id, event.metadata.event_id);
        assert_eq!(record.aggregate_type, "note");
        assert_eq!(record.aggregate_id, event.metadata.aggregate_id);
        assert_eq!(record.event_type, "note.added");
        assert_eq!(record.payload, serde_json::json!({"text": "hello"}));
        assert_eq!(record.correlation_id, event.metadata.correlation_id);
        assert_eq!(record.occurred_at, event.metadata.occurred_at);
        assert!(!record.is_processed());
        assert!(record.processed_at.is_none());
    }

    #[test]
    fn test_event_metadata_matches_source_event() {
        let event = note_event();
        let record = OutboxRecord::from_event("note", &event).unwrap();

        let metadata = record.event_metadata();

        assert_eq!(metadata, event.metadata);
    }

    #[test]
    fn test_mark_processed_sets_flag_and_timestamp_together() {
        let mut record = OutboxRecord::from_event("note", &note_event()).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 5, 0).unwrap();

        record.mark_processed(at).unwrap();

        assert!(record.is_processed());
        assert_eq!(record.processed_at, Some(at));
    }

    #[test]
    fn test_mark_processed_twice_is_rejected_and_keeps_first_timestamp() {
        // Arrange
        let mut record = OutboxRecord::from_event("note", &note_event()).unwrap();
        let first = Utc.with_ymd_and_hms(2026, 1, 15, 10, 5, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();
        record.mark_processed(first).unwrap();

        // Act
        let result = record.mark_processed(second);

        // Assert
        match result {
            Err(DomainError::AlreadyProcessed(id)) => assert_eq!(id, record.id),
            other => panic!("expected AlreadyProcessed, got {other:?}"),
        }
        assert_eq!(record.processed_at, Some(first));
    }
}
