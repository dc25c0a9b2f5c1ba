//! The outbox dispatch loop.
//!
//! One cycle fetches a batch of unprocessed records oldest first and, for
//! each record in order, decodes it, publishes it and marks it processed.
//! Per-record failures are logged and leave the record for a later cycle;
//! only a failed fetch aborts the cycle.

use std::sync::Arc;
use std::time::Instant;

use patientapp_core::clock::Clock;
use patientapp_core::error::DomainError;
use patientapp_core::outbox::{OutboxRecord, OutboxStore};
use patientapp_core::publisher::EventPublisher;
use patientapp_core::registry::DecoderRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::DispatcherConfig;
use crate::error::DispatchError;

/// Counts of what happened to the records of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the fetch.
    pub fetched: usize,
    /// Records published and marked processed.
    pub published: usize,
    /// Records whose publish or mark failed. They are retried next cycle.
    pub failed: usize,
    /// Records that could not be decoded. They stay unprocessed.
    pub skipped: usize,
    /// Records not attempted, or abandoned mid-publish, because of shutdown.
    pub cancelled: usize,
}

enum Outcome {
    Published,
    Failed,
    Skipped,
    Cancelled,
}

/// Relays committed outbox records to the message broker.
pub struct OutboxDispatcher {
    store: Arc<dyn OutboxStore>,
    publisher: Arc<dyn EventPublisher>,
    registry: DecoderRegistry,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn OutboxStore>,
        publisher: Arc<dyn EventPublisher>,
        registry: DecoderRegistry,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            registry,
            clock,
            config,
        }
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// A full batch that made progress is followed immediately by another
    /// cycle. Otherwise the loop sleeps for the poll interval. Processed
    /// records past the retention window are purged at most once per sweep
    /// interval.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval = ?self.config.poll_interval,
            "outbox dispatcher started"
        );
        let mut next_purge = Instant::now();

        while !shutdown.is_cancelled() {
            let drain_again = match self.run_cycle(&shutdown).await {
                Ok(report) => {
                    if report.fetched > 0 {
                        info!(
                            fetched = report.fetched,
                            published = report.published,
                            failed = report.failed,
                            skipped = report.skipped,
                            cancelled = report.cancelled,
                            "outbox cycle finished"
                        );
                    }
                    report.fetched >= self.config.batch_size as usize && report.published > 0
                }
                Err(e) => {
                    error!(error = %e, "outbox cycle failed");
                    false
                }
            };

            if self.config.retention.is_some() && Instant::now() >= next_purge {
                match self.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "purged expired outbox records"),
                    Err(e) => warn!(error = %e, "outbox retention purge failed"),
                }
                next_purge = Instant::now() + self.config.retention_sweep_interval;
            }

            if drain_again {
                continue;
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                () = shutdown.cancelled() => break,
            }
        }

        info!("outbox dispatcher stopped");
    }

    /// Runs one dispatch cycle.
    ///
    /// Cancellation is checked before each record and while a publish is in
    /// flight. An abandoned publish is never marked processed.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Fetch` if the unprocessed records could not
    /// be read.
    pub async fn run_cycle(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<CycleReport, DispatchError> {
        let records = self
            .store
            .fetch_unprocessed(self.config.batch_size)
            .await
            .map_err(DispatchError::Fetch)?;

        let mut report = CycleReport {
            fetched: records.len(),
            ..CycleReport::default()
        };

        for (index, record) in records.iter().enumerate() {
            if shutdown.is_cancelled() {
                report.cancelled += records.len() - index;
                break;
            }

            let span = info_span!(
                "dispatch_outbox_record",
                record_id = %record.id,
                event_type = %record.event_type,
                correlation_id = %record.correlation_id,
            );
            match self.dispatch(record, shutdown).instrument(span).await {
                Outcome::Published => report.published += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Cancelled => {
                    report.cancelled += records.len() - index;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Deletes processed records older than the retention window. Returns
    /// the number removed, or 0 when retention is disabled.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the retention window reaches
    /// past the earliest representable time, or whatever the store reports
    /// for a failed delete.
    pub async fn purge_expired(&self) -> Result<u64, DomainError> {
        let Some(retention) = self.config.retention else {
            return Ok(0);
        };
        let now = self.clock.now();
        let cutoff = now.checked_sub_signed(retention).ok_or_else(|| {
            DomainError::Validation(format!(
                "retention of {} hours reaches before the earliest representable time",
                retention.num_hours()
            ))
        })?;
        self.store.purge_processed_before(cutoff).await
    }

    async fn dispatch(&self, record: &OutboxRecord, shutdown: &CancellationToken) -> Outcome {
        let event = match self.registry.decode(record) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "outbox record could not be decoded, skipping");
                return Outcome::Skipped;
            }
        };

        let published = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("shutdown while publishing, leaving record unprocessed");
                return Outcome::Cancelled;
            }
            result = self.publisher.publish(event.as_ref()) => result,
        };
        if let Err(e) = published {
            warn!(error = %e, "failed to publish outbox record");
            return Outcome::Failed;
        }

        match self.store.mark_processed(record.id, self.clock.now()).await {
            Ok(()) => {
                debug!("outbox record published");
                Outcome::Published
            }
            Err(DomainError::AlreadyProcessed(_)) => {
                debug!("outbox record was already marked processed");
                Outcome::Published
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "published outbox record could not be marked processed"
                );
                Outcome::Failed
            }
        }
    }
}
