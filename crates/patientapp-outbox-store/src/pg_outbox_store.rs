//! `PostgreSQL` implementation of the `OutboxStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use patientapp_core::error::DomainError;
use patientapp_core::outbox::{OutboxRecord, OutboxStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::SqlxResultExt;

/// Row shape of `outbox_messages`.
#[derive(Debug, FromRow)]
struct OutboxRow {
    id: Uuid,
    aggregate_type: String,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    sequence_number: i64,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxRecord {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.id,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            sequence_number: row.sequence_number,
            correlation_id: row.correlation_id,
            causation_id: row.causation_id,
            occurred_at: row.occurred_at,
            processed: row.processed,
            processed_at: row.processed_at,
        }
    }
}

/// PostgreSQL-backed outbox store.
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    /// Creates a new `PgOutboxStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads one record by id, processed or not.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    pub async fn find(&self, id: Uuid) -> Result<Option<OutboxRecord>, DomainError> {
        let row = sqlx::query_as::<_, OutboxRow>(
            r"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, sequence_number,
                   correlation_id, causation_id, occurred_at, processed, processed_at
            FROM outbox_messages
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_infra("find outbox record")?;

        Ok(row.map(OutboxRecord::from))
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, sequence_number,
                   correlation_id, causation_id, occurred_at, processed, processed_at
            FROM outbox_messages
            WHERE processed = FALSE
            ORDER BY occurred_at ASC, id ASC
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_infra("fetch unprocessed outbox records")?;

        Ok(rows.into_iter().map(OutboxRecord::from).collect())
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages
            SET processed = TRUE, processed_at = $2
            WHERE id = $1 AND processed = FALSE
            ",
        )
        .bind(id)
        .bind(processed_at)
        .execute(&self.pool)
        .await
        .map_infra("mark outbox record processed")?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.find(id).await? {
            Some(_) => Err(DomainError::AlreadyProcessed(id)),
            None => Err(DomainError::AggregateNotFound(id)),
        }
    }

    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r"
            DELETE FROM outbox_messages
            WHERE processed = TRUE AND processed_at < $1
            ",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_infra("purge processed outbox records")?;

        Ok(result.rows_affected())
    }
}
