//! API configuration

use domain_receivables::LedgerConfig;
use serde::Deserialize;

/// API configuration
///
/// Read from `RECEIVABLES_`-prefixed environment variables; nested ledger
/// settings use a double underscore, e.g. `RECEIVABLES_LEDGER__MAX_APPEND_ATTEMPTS`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Upper bound of the database pool
    pub max_connections: u32,
    pub ledger: LedgerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/receivables".to_string(),
            log_level: "info".to_string(),
            max_connections: 10,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment, defaulting anything unset
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("RECEIVABLES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
