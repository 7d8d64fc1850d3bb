//! Application configuration loaded from environment variables.

use std::time::Duration;

use broker::RetryPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8000`)
/// - `DATABASE_URL` — Postgres connection string; in-memory stores when unset
/// - `PRODUCT_SERVICE_URL` — base URL of a remote product catalog; the local
///   stock ledger serves lookups when unset
/// - `BROKER_RETRY_SECS` — fixed delay between broker setup attempts
///   (default: `5`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub product_service_url: Option<String>,
    pub broker_retry_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            database_url: std::env::var("DATABASE_URL").ok(),
            product_service_url: std::env::var("PRODUCT_SERVICE_URL").ok(),
            broker_retry_secs: std::env::var("BROKER_RETRY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The retry policy used while declaring broker topology at startup.
    pub fn broker_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_secs(self.broker_retry_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            product_service_url: None,
            broker_retry_secs: 5,
        }
    }
}
