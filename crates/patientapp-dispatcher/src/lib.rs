//! Patient App — outbox dispatcher.
//!
//! Polls committed outbox records, decodes them back into domain events,
//! publishes them to NATS JetStream, and marks each one processed once the
//! broker confirmed it. Delivery is at-least-once: a record published but
//! not yet marked is published again on the next cycle, with the same
//! message id.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod nats_publisher;
