//! `PostgreSQL` implementation of the unit-of-work `Transaction`.

use std::any::Any;

use async_trait::async_trait;
use patientapp_core::error::DomainError;
use patientapp_core::outbox::OutboxRecord;
use patientapp_core::unit_of_work::{Transaction, TransactionManager};
use sqlx::{PgConnection, PgPool, Postgres};

use crate::error::SqlxResultExt;

/// A `sqlx` transaction shared by repositories and the outbox commit hook.
pub struct PgTransaction {
    inner: Option<sqlx::Transaction<'static, Postgres>>,
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction")
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl PgTransaction {
    /// Wraps an open `sqlx` transaction.
    #[must_use]
    pub fn new(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        Self { inner: Some(tx) }
    }

    /// Returns the connection to execute statements on.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the transaction was already
    /// committed or rolled back.
    pub fn connection(&mut self) -> Result<&mut PgConnection, DomainError> {
        self.inner
            .as_deref_mut()
            .ok_or_else(|| DomainError::Infrastructure("transaction already finished".into()))
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn stage_outbox_records(&mut self, records: &[OutboxRecord]) -> Result<(), DomainError> {
        let conn = self.connection()?;
        for record in records {
            sqlx::query(
                r"
                INSERT INTO outbox_messages
                    (id, aggregate_type, aggregate_id, event_type, payload, sequence_number,
                     correlation_id, causation_id, occurred_at, processed, processed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, NULL)
                ",
            )
            .bind(record.id)
            .bind(&record.aggregate_type)
            .bind(record.aggregate_id)
            .bind(&record.event_type)
            .bind(&record.payload)
            .bind(record.sequence_number)
            .bind(record.correlation_id)
            .bind(record.causation_id)
            .bind(record.occurred_at)
            .execute(&mut *conn)
            .await
            .map_infra("insert outbox record")?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| DomainError::Infrastructure("transaction already finished".into()))?;
        tx.commit().await.map_infra("commit transaction")
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| DomainError::Infrastructure("transaction already finished".into()))?;
        tx.rollback().await.map_infra("rollback transaction")
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcasts a unit-of-work transaction to the `PostgreSQL` one.
pub trait PgTransactionExt {
    /// Returns the concrete `PgTransaction`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the transaction belongs to a
    /// different storage engine.
    fn as_pg(&mut self) -> Result<&mut PgTransaction, DomainError>;
}

impl PgTransactionExt for dyn Transaction + '_ {
    fn as_pg(&mut self) -> Result<&mut PgTransaction, DomainError> {
        self.as_any_mut()
            .downcast_mut::<PgTransaction>()
            .ok_or_else(|| DomainError::Infrastructure("expected a PgTransaction".into()))
    }
}

/// Opens `PgTransaction`s from a connection pool.
#[derive(Debug, Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    /// Creates a new `PgTransactionManager`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        let tx = self.pool.begin().await.map_infra("begin transaction")?;
        Ok(Box::new(PgTransaction::new(tx)))
    }
}
