//! Unit of work and the outbox commit hook.
//!
//! A unit of work wraps one storage transaction. Repositories stage state
//! writes into it; `UnitOfWork::commit` then projects every buffered domain
//! event of the participating aggregates into outbox records, stages them in
//! the same transaction, commits, and only then drains the buffers. Either
//! the state change and all of its outbox records become durable, or none
//! of them do.

use std::any::Any;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::aggregate::EventSource;
use crate::context::CorrelationContext;
use crate::error::{DomainError, DomainResult};
use crate::outbox::OutboxRecord;

/// One storage transaction spanning aggregate state and outbox records.
#[async_trait]
pub trait Transaction: Send {
    /// Stages outbox records for insertion in this transaction. An empty
    /// slice is a no-op.
    async fn stage_outbox_records(&mut self, records: &[OutboxRecord]) -> DomainResult<()>;

    /// Commits every staged write atomically.
    async fn commit(&mut self) -> DomainResult<()>;

    /// Discards every staged write.
    async fn rollback(&mut self) -> DomainResult<()>;

    /// Exposes the concrete transaction so repositories can stage their own
    /// writes through it.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Opens storage transactions.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Begins a new transaction.
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>>;
}

/// Scope of one atomic commit across one or more aggregates.
pub struct UnitOfWork {
    tx: Box<dyn Transaction>,
    ctx: CorrelationContext,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Begins a unit of work on a fresh transaction.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the transaction cannot be
    /// opened.
    pub async fn begin(
        manager: &dyn TransactionManager,
        ctx: CorrelationContext,
    ) -> DomainResult<Self> {
        let tx = manager.begin().await?;
        Ok(Self { tx, ctx })
    }

    /// The correlation context this unit of work runs under.
    #[must_use]
    pub fn context(&self) -> &CorrelationContext {
        &self.ctx
    }

    /// The underlying transaction, for repositories staging state writes.
    pub fn transaction(&mut self) -> &mut dyn Transaction {
        self.tx.as_mut()
    }

    /// Commits staged state together with the buffered events of
    /// `aggregates`, returning the number of outbox records written.
    ///
    /// Events keep their insertion order within each aggregate; aggregates
    /// are visited in the order given. Buffers are drained only once the
    /// commit succeeded, so a failed commit leaves them intact for a retry.
    ///
    /// # Errors
    ///
    /// Returns the serialization, staging, or commit error that aborted the
    /// unit of work. The transaction is rolled back and nothing is
    /// persisted.
    pub async fn commit(
        mut self,
        aggregates: &mut [&mut dyn EventSource],
    ) -> DomainResult<usize> {
        let records = match collect_outbox_records(aggregates) {
            Ok(records) => records,
            Err(e) => return Err(self.abort(e).await),
        };

        if let Err(e) = self.tx.stage_outbox_records(&records).await {
            return Err(self.abort(e).await);
        }

        if let Err(e) = self.tx.commit().await {
            warn!(
                correlation_id = %self.ctx.correlation_id,
                error = %e,
                "Unit of work commit failed"
            );
            return Err(e);
        }

        for aggregate in aggregates.iter_mut() {
            aggregate.clear_pending_events();
        }

        debug!(
            correlation_id = %self.ctx.correlation_id,
            outbox_records = records.len(),
            "Unit of work committed"
        );

        Ok(records.len())
    }

    /// Rolls back without committing anything.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the rollback itself fails.
    pub async fn rollback(mut self) -> DomainResult<()> {
        self.tx.rollback().await
    }

    async fn abort(&mut self, cause: DomainError) -> DomainError {
        warn!(
            correlation_id = %self.ctx.correlation_id,
            error = %cause,
            "Unit of work aborted"
        );
        if let Err(e) = self.tx.rollback().await {
            warn!(error = %e, "Rollback after aborted unit of work failed");
        }
        cause
    }
}

/// Projects the buffered events of every aggregate with pending events into
/// outbox records, preserving per-aggregate insertion order.
///
/// # Errors
///
/// Returns `DomainError::Serialization` if any payload cannot be encoded.
pub fn collect_outbox_records(
    aggregates: &[&mut dyn EventSource],
) -> DomainResult<Vec<OutboxRecord>> {
    let mut records = Vec::new();
    for aggregate in aggregates.iter().filter(|a| a.has_pending_events()) {
        let staged = aggregate.to_outbox_records()?;
        debug!(
            aggregate_id = %aggregate.source_id(),
            outbox_records = staged.len(),
            "Projected pending events"
        );
        records.extend(staged);
    }
    Ok(records)
}
