//! Environment configuration for the dispatcher process.

use std::time::Duration;

use crate::error::AppError;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";
/// Default subject prefix events are published under.
pub const DEFAULT_SUBJECT_PREFIX: &str = "patient.events";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_BATCH_SIZE: u32 = 100;
const DEFAULT_RETENTION_HOURS: i64 = 168;
/// Upper bound on `OUTBOX_RETENTION_HOURS` (100 years).
pub const MAX_RETENTION_HOURS: i64 = 24 * 366 * 100;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(3_600);

/// Tuning of the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Pause between cycles that did not fill a batch.
    pub poll_interval: Duration,
    /// Maximum number of records fetched per cycle.
    pub batch_size: u32,
    /// How long processed records are kept. `None` keeps them forever.
    pub retention: Option<chrono::Duration>,
    /// Minimum time between two retention sweeps.
    pub retention_sweep_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            batch_size: DEFAULT_BATCH_SIZE,
            retention: Some(chrono::Duration::hours(DEFAULT_RETENTION_HOURS)),
            retention_sweep_interval: RETENTION_SWEEP_INTERVAL,
        }
    }
}

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection string (`DATABASE_URL`).
    pub database_url: String,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`).
    pub database_max_connections: u32,
    /// NATS server URL (`NATS_URL`).
    pub nats_url: String,
    /// Subject prefix (`OUTBOX_SUBJECT_PREFIX`).
    pub subject_prefix: String,
    /// Loop tuning (`OUTBOX_POLL_INTERVAL_MS`, `OUTBOX_BATCH_SIZE`,
    /// `OUTBOX_RETENTION_HOURS`).
    pub dispatcher: DispatcherConfig,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".into())
            })?;

        let database_max_connections: u32 =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".into(),
            ));
        }

        let poll_interval_ms: u64 =
            parse_or(&lookup, "OUTBOX_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval_ms == 0 {
            return Err(AppError::Config(
                "OUTBOX_POLL_INTERVAL_MS must be greater than zero".into(),
            ));
        }

        let batch_size: u32 = parse_or(&lookup, "OUTBOX_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(AppError::Config(
                "OUTBOX_BATCH_SIZE must be greater than zero".into(),
            ));
        }

        let retention_hours: i64 =
            parse_or(&lookup, "OUTBOX_RETENTION_HOURS", DEFAULT_RETENTION_HOURS)?;
        let retention = match retention_hours {
            0 => None,
            h if h < 0 => {
                return Err(AppError::Config(
                    "OUTBOX_RETENTION_HOURS must not be negative".into(),
                ));
            }
            h if h > MAX_RETENTION_HOURS => {
                return Err(AppError::Config(format!(
                    "OUTBOX_RETENTION_HOURS must not exceed {MAX_RETENTION_HOURS}"
                )));
            }
            h => Some(chrono::Duration::try_hours(h).ok_or_else(|| {
                AppError::Config(format!("OUTBOX_RETENTION_HOURS is out of range ({h})"))
            })?),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            nats_url: lookup("NATS_URL").unwrap_or_else(|| DEFAULT_NATS_URL.to_owned()),
            subject_prefix: lookup("OUTBOX_SUBJECT_PREFIX")
                .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_owned()),
            dispatcher: DispatcherConfig {
                poll_interval: Duration::from_millis(poll_interval_ms),
                batch_size,
                retention,
                retention_sweep_interval: RETENTION_SWEEP_INTERVAL,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ('{raw}'): {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        // Arrange / Act
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/patients")]).unwrap();

        // Assert
        assert_eq!(config.database_url, "postgres://localhost/patients");
        assert_eq!(config.nats_url, DEFAULT_NATS_URL);
        assert_eq!(config.subject_prefix, DEFAULT_SUBJECT_PREFIX);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.dispatcher, DispatcherConfig::default());
    }

    #[test]
    fn test_missing_database_url_is_config_error() {
        let result = config_from(&[]);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("DATABASE_URL")));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/patients"),
            ("NATS_URL", "nats://broker:4222"),
            ("OUTBOX_SUBJECT_PREFIX", "clinic.events"),
            ("OUTBOX_POLL_INTERVAL_MS", "250"),
            ("OUTBOX_BATCH_SIZE", "20"),
            ("OUTBOX_RETENTION_HOURS", "24"),
        ])
        .unwrap();

        assert_eq!(config.nats_url, "nats://broker:4222");
        assert_eq!(config.subject_prefix, "clinic.events");
        assert_eq!(config.dispatcher.poll_interval, Duration::from_millis(250));
        assert_eq!(config.dispatcher.batch_size, 20);
        assert_eq!(config.dispatcher.retention, Some(chrono::Duration::hours(24)));
    }

    #[test]
    fn test_zero_retention_disables_purge() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/patients"),
            ("OUTBOX_RETENTION_HOURS", "0"),
        ])
        .unwrap();

        assert!(config.dispatcher.retention.is_none());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for (key, value) in [
            ("OUTBOX_BATCH_SIZE", "lots"),
            ("OUTBOX_BATCH_SIZE", "0"),
            ("OUTBOX_POLL_INTERVAL_MS", "-5"),
            ("OUTBOX_POLL_INTERVAL_MS", "0"),
            ("OUTBOX_RETENTION_HOURS", "-1"),
            ("OUTBOX_RETENTION_HOURS", "3000000000000000"),
            ("OUTBOX_RETENTION_HOURS", "10000000000"),
            ("OUTBOX_RETENTION_HOURS", "9223372036854775808"),
            ("OUTBOX_BATCH_SIZE", "4294967296"),
            ("OUTBOX_POLL_INTERVAL_MS", "18446744073709551616"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
            ("DATABASE_MAX_CONNECTIONS", "4294967296"),
        ] {
            let result = config_from(&[("DATABASE_URL", "postgres://db/patients"), (key, value)]);

            assert!(
                matches!(result, Err(AppError::Config(_))),
                "expected {key}={value} to be rejected"
            );
        }
    }

    #[test]
    fn test_largest_retention_is_accepted() {
        let max = MAX_RETENTION_HOURS.to_string();

        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/patients"),
            ("OUTBOX_RETENTION_HOURS", max.as_str()),
        ])
        .unwrap();

        assert_eq!(
            config.dispatcher.retention,
            Some(chrono::Duration::hours(MAX_RETENTION_HOURS))
        );
    }
}
