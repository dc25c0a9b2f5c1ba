//! Aggregate root abstraction and the per-aggregate event buffer.

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::outbox::OutboxRecord;

/// Ordered buffer of events raised by an aggregate and not yet committed.
///
/// Empty when the aggregate is created or loaded. Business methods append to
/// the tail; the unit of work drains it once the commit succeeded. It is
/// never persisted itself and performs no deduplication.
#[derive(Debug)]
pub struct EventBuffer<E> {
    events: Vec<E>,
}

impl<E> EventBuffer<E> {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Appends an event to the tail of the buffer.
    pub fn append(&mut self, event: E) {
        self.events.push(event);
    }

    /// Returns the buffered events in insertion order and empties the buffer.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    /// Returns the buffered events without removing them.
    #[must_use]
    pub fn pending(&self) -> &[E] {
        &self.events
    }

    /// Returns the number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for aggregate roots that raise domain events.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the aggregate type name (e.g. `"patient"`).
    fn aggregate_type(&self) -> &'static str;

    /// Returns the persisted version, used for optimistic concurrency.
    fn version(&self) -> i64;

    /// Read access to the event buffer.
    fn events(&self) -> &EventBuffer<Self::Event>;

    /// Write access to the event buffer.
    fn events_mut(&mut self) -> &mut EventBuffer<Self::Event>;

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event] {
        self.events().pending()
    }

    /// Removes and returns uncommitted events after persistence.
    fn drain_events(&mut self) -> Vec<Self::Event> {
        self.events_mut().drain()
    }
}

/// Object-safe view of an aggregate's event buffer, enumerated by the
/// unit-of-work commit hook.
pub trait EventSource: Send {
    /// Returns the aggregate identifier.
    fn source_id(&self) -> Uuid;

    /// Returns `true` when the aggregate has buffered events.
    fn has_pending_events(&self) -> bool;

    /// Projects every buffered event, in insertion order, to an outbox record.
    /// The buffer is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if an event payload cannot be
    /// encoded.
    fn to_outbox_records(&self) -> Result<Vec<OutboxRecord>, DomainError>;

    /// Empties the buffer, returning how many events were discarded.
    fn clear_pending_events(&mut self) -> usize;
}

impl<A: AggregateRoot> EventSource for A {
    fn source_id(&self) -> Uuid {
        self.aggregate_id()
    }

    fn has_pending_events(&self) -> bool {
        !self.events().is_empty()
    }

    fn to_outbox_records(&self) -> Result<Vec<OutboxRecord>, DomainError> {
        self.uncommitted_events()
            .iter()
            .map(|event| OutboxRecord::from_event(self.aggregate_type(), event))
            .collect()
    }

    fn clear_pending_events(&mut self) -> usize {
        self.drain_events().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_insertion_order() {
        // Arrange
        let mut buffer = EventBuffer::new();

        // Act
        buffer.append("first");
        buffer.append("second");
        buffer.append("third");

        // Assert
        assert_eq!(buffer.pending(), &["first", "second", "third"]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_drain_returns_events_and_empties_buffer() {
        // Arrange
        let mut buffer = EventBuffer::new();
        buffer.append(1);
        buffer.append(2);

        // Act
        let drained = buffer.drain();

        // Assert
        assert_eq!(drained, vec![1, 2]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_second_drain_returns_empty() {
        let mut buffer = EventBuffer::new();
        buffer.append(1);

        let _ = buffer.drain();
        let second = buffer.drain();

        assert!(second.is_empty());
    }

    #[test]
    fn test_buffer_does_not_deduplicate() {
        let mut buffer = EventBuffer::new();

        buffer.append("same");
        buffer.append("same");

        assert_eq!(buffer.len(), 2);
    }
}
