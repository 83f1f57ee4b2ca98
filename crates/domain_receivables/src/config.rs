//! Ledger engine settings

use serde::{Deserialize, Serialize};

use core_kernel::Timezone;

/// Tunables for the ledger engine
///
/// Loaded as the `ledger` section of the API configuration; every field
/// has a default so the section may be omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Times an append is retried after losing a sequence race
    pub max_append_attempts: u32,
    /// Timezone that statement date filters are interpreted in
    pub business_timezone: Timezone,
    /// Suffix appended to descriptions of reconciler-written entries
    pub backfill_label: String,
    /// Customers reconciled in parallel by a full sweep
    pub sweep_concurrency: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_append_attempts: 3,
            business_timezone: Timezone::default(),
            backfill_label: "backfilled".to_string(),
            sweep_concurrency: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"business_timezone": "Europe/Istanbul"}"#).unwrap();

        assert_eq!(config.business_timezone, Timezone::new(chrono_tz::Europe::Istanbul));
        assert_eq!(config.max_append_attempts, 3);
        assert_eq!(config.backfill_label, "backfilled");
    }
}
