//! Tests for the unit-of-work commit hook against the in-memory store.

use chrono::{Duration, TimeZone, Utc};
use patientapp_core::aggregate::{AggregateRoot, EventBuffer, EventSource};
use patientapp_core::clock::Clock;
use patientapp_core::context::CorrelationContext;
use patientapp_core::error::DomainError;
use patientapp_core::event::{DomainEvent, EventMetadata};
use patientapp_core::outbox::OutboxStore;
use patientapp_core::unit_of_work::UnitOfWork;
use patientapp_test_support::{FixedClock, InMemoryOutbox, InMemoryTransaction, SteppingClock};
use uuid::Uuid;

#[derive(Debug)]
struct CounterEvent {
    metadata: EventMetadata,
    by: u32,
}

impl DomainEvent for CounterEvent {
    fn event_type(&self) -> &'static str {
        "counter.incremented"
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        Ok(serde_json::json!({ "by": self.by }))
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Debug)]
struct Counter {
    id: Uuid,
    value: u32,
    events: EventBuffer<CounterEvent>,
}

impl Counter {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            value: 0,
            events: EventBuffer::new(),
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn increment(&mut self, by: u32, ctx: &CorrelationContext, clock: &dyn Clock) {
        self.value += by;
        let sequence = self.events.len() as i64 + 1;
        let metadata = EventMetadata::new("counter.incremented", self.id, sequence, ctx, clock);
        self.events.append(CounterEvent { metadata, by });
    }
}

impl AggregateRoot for Counter {
    type Event = CounterEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn aggregate_type(&self) -> &'static str {
        "counter"
    }

    fn version(&self) -> i64 {
        0
    }

    fn events(&self) -> &EventBuffer<CounterEvent> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventBuffer<CounterEvent> {
        &mut self.events
    }
}

fn stage_counter(uow: &mut UnitOfWork, counter: &Counter) {
    let tx = uow
        .transaction()
        .as_any_mut()
        .downcast_mut::<InMemoryTransaction>()
        .unwrap();
    tx.stage_row("counters", counter.id, serde_json::json!({ "value": counter.value }));
}

fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

#[tokio::test]
async fn test_commit_persists_one_record_per_buffered_event() {
    // Arrange
    let store = InMemoryOutbox::new();
    let ctx = CorrelationContext::generate();
    let clock = fixed_clock();
    let mut counter = Counter::new();
    counter.increment(1, &ctx, &clock);
    counter.increment(2, &ctx, &clock);

    // Act
    let mut uow = UnitOfWork::begin(&store, ctx).await.unwrap();
    stage_counter(&mut uow, &counter);
    let written = uow.commit(&mut [&mut counter]).await.unwrap();

    // Assert
    assert_eq!(written, 2);
    let records = store.unprocessed();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.event_type == "counter.incremented"));
    assert!(records.iter().all(|r| r.aggregate_type == "counter"));
    assert!(records.iter().all(|r| r.correlation_id == ctx.correlation_id));
    assert_eq!(records[0].payload, serde_json::json!({ "by": 1 }));
    assert_eq!(records[1].payload, serde_json::json!({ "by": 2 }));
    assert_eq!(
        store.row("counters", counter.id),
        Some(serde_json::json!({ "value": 3 }))
    );
}

#[tokio::test]
async fn test_commit_drains_buffers_after_success() {
    let store = InMemoryOutbox::new();
    let ctx = CorrelationContext::generate();
    let mut counter = Counter::new();
    counter.increment(1, &ctx, &fixed_clock());

    let uow = UnitOfWork::begin(&store, ctx).await.unwrap();
    uow.commit(&mut [&mut counter]).await.unwrap();

    assert!(counter.uncommitted_events().is_empty());
    assert!(!counter.has_pending_events());
}

#[tokio::test]
async fn test_failed_commit_persists_nothing_and_keeps_buffer() {
    // Arrange
    let store = InMemoryOutbox::new();
    store.fail_commits(true);
    let ctx = CorrelationContext::generate();
    let mut counter = Counter::new();
    counter.increment(5, &ctx, &fixed_clock());

    // Act
    let mut uow = UnitOfWork::begin(&store, ctx).await.unwrap();
    stage_counter(&mut uow, &counter);
    let result = uow.commit(&mut [&mut counter]).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert!(store.records().is_empty());
    assert!(store.row("counters", counter.id).is_none());
    assert_eq!(counter.uncommitted_events().len(), 1);
}

#[tokio::test]
async fn test_commit_without_events_writes_state_only() {
    let store = InMemoryOutbox::new();
    let counter = Counter::new();

    let mut uow = UnitOfWork::begin(&store, CorrelationContext::generate())
        .await
        .unwrap();
    stage_counter(&mut uow, &counter);
    let written = uow.commit(&mut []).await.unwrap();

    assert_eq!(written, 0);
    assert!(store.records().is_empty());
    assert_eq!(store.commit_count(), 1);
}

#[tokio::test]
async fn test_events_from_several_aggregates_keep_per_aggregate_order() {
    // Arrange
    let store = InMemoryOutbox::new();
    let ctx = CorrelationContext::generate();
    let clock = SteppingClock::new(
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        Duration::milliseconds(1),
    );
    let mut first = Counter::new();
    let mut second = Counter::new();
    first.increment(1, &ctx, &clock);
    second.increment(10, &ctx, &clock);
    first.increment(2, &ctx, &clock);
    second.increment(20, &ctx, &clock);

    // Act
    let uow = UnitOfWork::begin(&store, ctx).await.unwrap();
    uow.commit(&mut [&mut first, &mut second]).await.unwrap();

    // Assert
    let fetched = store.fetch_unprocessed(10).await.unwrap();
    let first_payloads: Vec<_> = fetched
        .iter()
        .filter(|r| r.aggregate_id == first.id)
        .map(|r| r.payload["by"].clone())
        .collect();
    let second_payloads: Vec<_> = fetched
        .iter()
        .filter(|r| r.aggregate_id == second.id)
        .map(|r| r.payload["by"].clone())
        .collect();
    assert_eq!(first_payloads, vec![serde_json::json!(1), serde_json::json!(2)]);
    assert_eq!(second_payloads, vec![serde_json::json!(10), serde_json::json!(20)]);
}

#[tokio::test]
async fn test_same_timestamp_events_are_fetched_in_append_order() {
    let store = InMemoryOutbox::new();
    let ctx = CorrelationContext::generate();
    let clock = fixed_clock();
    let mut counter = Counter::new();
    for by in 1..=5 {
        counter.increment(by, &ctx, &clock);
    }

    let uow = UnitOfWork::begin(&store, ctx).await.unwrap();
    uow.commit(&mut [&mut counter]).await.unwrap();

    let fetched = store.fetch_unprocessed(10).await.unwrap();
    let order: Vec<i64> = fetched.iter().map(|r| r.sequence_number).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_explicit_rollback_discards_staged_state() {
    let store = InMemoryOutbox::new();
    let counter = Counter::new();

    let mut uow = UnitOfWork::begin(&store, CorrelationContext::generate())
        .await
        .unwrap();
    stage_counter(&mut uow, &counter);
    uow.rollback().await.unwrap();

    assert!(store.row("counters", counter.id).is_none());
    assert_eq!(store.rollback_count(), 1);
    assert_eq!(store.commit_count(), 0);
}
