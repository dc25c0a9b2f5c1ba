//! Patient App — Patient bounded context.
//!
//! Responsible for patient registration and medical aid details (Medicare
//! card and private health fund accounts). Every state change is committed
//! through a unit of work together with the outbox records of the events it
//! raised.

pub mod application;
pub mod domain;
pub mod infrastructure;
