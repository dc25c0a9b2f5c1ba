//! Patient App outbox dispatcher entry point.

use std::sync::Arc;

use patientapp_core::clock::SystemClock;
use patientapp_core::registry::DecoderRegistry;
use patientapp_dispatcher::config::AppConfig;
use patientapp_dispatcher::dispatcher::OutboxDispatcher;
use patientapp_dispatcher::error::AppError;
use patientapp_dispatcher::nats_publisher::NatsEventPublisher;
use patientapp_outbox_store::pg_outbox_store::PgOutboxStore;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Patient App outbox dispatcher");

    let config = AppConfig::from_env()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    let client = async_nats::connect(config.nats_url.as_str())
        .await
        .map_err(|e| AppError::Broker(format!("failed to connect to {}: {e}", config.nats_url)))?;
    tracing::info!(nats_url = %config.nats_url, "Connected to NATS");

    // Every event kind a bounded context can emit must be registered here.
    let mut registry = DecoderRegistry::new();
    patientapp_patient::application::decoders::register_decoders(&mut registry)
        .map_err(|e| AppError::Config(e.to_string()))?;

    let dispatcher = OutboxDispatcher::new(
        Arc::new(PgOutboxStore::new(pool)),
        Arc::new(NatsEventPublisher::new(client, config.subject_prefix.clone())),
        registry,
        Arc::new(SystemClock),
        config.dispatcher.clone(),
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    dispatcher.run(shutdown).await;

    Ok(())
}
