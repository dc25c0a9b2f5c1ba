//! Static mapping from event kind to decoder.
//!
//! Every bounded context registers a decoder for each kind it can emit when
//! the process starts. An unknown kind is then a single, controlled error
//! instead of a runtime type lookup.

use std::collections::HashMap;

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::outbox::OutboxRecord;

/// Reconstructs the original event from an outbox record.
pub type EventDecoder = fn(&OutboxRecord) -> Result<Box<dyn DomainEvent>, DomainError>;

/// Registry of event decoders keyed by event kind.
#[derive(Debug, Default, Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<&'static str, EventDecoder>,
}

impl DecoderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the decoder for `event_type`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a decoder is already registered
    /// for the kind.
    pub fn register(
        &mut self,
        event_type: &'static str,
        decoder: EventDecoder,
    ) -> Result<(), DomainError> {
        if self.decoders.contains_key(event_type) {
            return Err(DomainError::Validation(format!(
                "decoder already registered for {event_type}"
            )));
        }
        self.decoders.insert(event_type, decoder);
        Ok(())
    }

    /// Returns `true` if a decoder is registered for `event_type`.
    #[must_use]
    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns `true` when no decoder is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decodes `record` with the decoder registered for its kind.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` when no decoder is registered,
    /// or whatever the decoder reports for a malformed payload.
    pub fn decode(&self, record: &OutboxRecord) -> Result<Box<dyn DomainEvent>, DomainError> {
        let decoder = self
            .decoders
            .get(record.event_type.as_str())
            .ok_or_else(|| DomainError::UnknownEventType(record.event_type.clone()))?;
        decoder(record)
    }
}
