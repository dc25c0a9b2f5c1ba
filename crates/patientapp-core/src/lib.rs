//! Patient App Core — shared domain abstractions.
//!
//! This crate defines the traits and types every bounded context depends on:
//! domain events and the per-aggregate event buffer, the outbox record and
//! the unit-of-work commit hook that stages records atomically with state,
//! and the seams the outbox dispatcher drives (store, decoder registry,
//! publisher). It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod context;
pub mod error;
pub mod event;
pub mod outbox;
pub mod publisher;
pub mod registry;
pub mod unit_of_work;
