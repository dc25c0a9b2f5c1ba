//! Outbox database schema.
//!
//! Mirrors the root `migrations/` directory, for callers that bootstrap the
//! table without running migrations.

/// SQL to create the outbox table.
pub const CREATE_OUTBOX_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS outbox_messages (
    id              UUID PRIMARY KEY,
    aggregate_type  VARCHAR(255) NOT NULL,
    aggregate_id    UUID NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    sequence_number BIGINT NOT NULL,
    correlation_id  UUID NOT NULL,
    causation_id    UUID NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL,
    processed       BOOLEAN NOT NULL DEFAULT FALSE,
    processed_at    TIMESTAMPTZ NULL,
    CONSTRAINT outbox_messages_processed_at_iff_processed
        CHECK (processed = (processed_at IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_outbox_messages_unprocessed
    ON outbox_messages (occurred_at, id)
    WHERE processed = FALSE;

CREATE INDEX IF NOT EXISTS idx_outbox_messages_processed_at
    ON outbox_messages (processed_at)
    WHERE processed = TRUE;
";
