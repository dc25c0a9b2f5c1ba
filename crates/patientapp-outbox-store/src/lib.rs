//! PostgreSQL storage for the transactional outbox.
//!
//! `PgTransaction` is the unit-of-work transaction: aggregate repositories
//! and the outbox commit hook write through the same `sqlx` transaction.
//! `PgOutboxStore` is the dispatcher's view of the `outbox_messages` table.

pub mod error;
pub mod pg_outbox_store;
pub mod pg_transaction;
pub mod schema;
