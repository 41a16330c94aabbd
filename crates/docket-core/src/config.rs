//! Configuration types for Docket components.
//!
//! Every value has a default matching the remote API's published limits
//! (about 120 requests per minute, 200 records per page). Deployments can
//! override them through `DOCKET_*` environment variables with
//! [`HttpConfig::from_env`], [`SyncConfig::from_env`] and [`DbConfig::from_env`].

use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// Reads an environment variable and parses it, falling back to `default`
/// when the variable is unset.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!("{} has an invalid value: '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

impl DbConfig {
    /// Reads `DOCKET_DB_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            max_connections: env_or("DOCKET_DB_MAX_CONNECTIONS", Self::default().max_connections)?,
        })
    }
}

/// HTTP client configuration for the remote case-management API.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries on a rate-limit status before the last response is returned.
    pub max_retries: u32,
    /// Fixed pause between successive page (or detail) requests.
    pub page_delay: Duration,
    /// Records per full page; a shorter page ends pagination when the
    /// pagination header is missing.
    pub page_size: usize,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            page_delay: Duration::from_millis(600),
            page_size: 200,
            user_agent: format!("Docket/{} (practice-sync)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Reads `DOCKET_HTTP_TIMEOUT_SECS`, `DOCKET_HTTP_MAX_RETRIES` and
    /// `DOCKET_PAGE_DELAY_MS`.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            timeout: Duration::from_secs(env_or(
                "DOCKET_HTTP_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            max_retries: env_or("DOCKET_HTTP_MAX_RETRIES", defaults.max_retries)?,
            page_delay: Duration::from_millis(env_or(
                "DOCKET_PAGE_DELAY_MS",
                defaults.page_delay.as_millis() as u64,
            )?),
            ..defaults
        })
    }

    /// Overrides the inter-request delay (tests use zero).
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

/// Synchronization configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records per upsert transaction.
    pub batch_size: usize,
    /// Statement timeout applied to each batch transaction.
    pub batch_timeout: Duration,
    /// Maximum matters deep-fetched in the details phase per run.
    pub detail_limit: usize,
    /// Pause between successive detail fetches.
    pub detail_delay: Duration,
    /// Age in days after which a matter counts as stale in statistics.
    pub stale_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_timeout: Duration::from_secs(30),
            detail_limit: 500,
            detail_delay: Duration::from_millis(600),
            stale_days: 30,
        }
    }
}

impl SyncConfig {
    /// Reads `DOCKET_BATCH_SIZE`, `DOCKET_BATCH_TIMEOUT_SECS`,
    /// `DOCKET_DETAIL_LIMIT`, `DOCKET_PAGE_DELAY_MS` and `DOCKET_STALE_DAYS`.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let batch_size: usize = env_or("DOCKET_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(AppError::ConfigError(
                "DOCKET_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            batch_size,
            batch_timeout: Duration::from_secs(env_or(
                "DOCKET_BATCH_TIMEOUT_SECS",
                defaults.batch_timeout.as_secs(),
            )?),
            detail_limit: env_or("DOCKET_DETAIL_LIMIT", defaults.detail_limit)?,
            detail_delay: Duration::from_millis(env_or(
                "DOCKET_PAGE_DELAY_MS",
                defaults.detail_delay.as_millis() as u64,
            )?),
            stale_days: env_or("DOCKET_STALE_DAYS", defaults.stale_days)?,
        })
    }

    /// Sets the batch size (minimum 1).
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets the maximum number of matters fetched in the details phase.
    pub fn with_detail_limit(mut self, limit: usize) -> Self {
        self.detail_limit = limit;
        self
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }
}
