//! Ledger DTOs

use chrono::{DateTime, Utc};
use core_kernel::{CustomerId, DateRange, TemporalError};
use domain_receivables::{EntryDirection, LedgerEntry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `?start=YYYY-MM-DD&end=YYYY-MM-DD`, both optional and inclusive
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRangeQuery {
    pub fn to_range(&self) -> Result<DateRange, TemporalError> {
        DateRange::parse(self.start.as_deref(), self.end.as_deref())
    }
}

/// A business event from a surrounding subsystem
///
/// `reference_id` is the sale, payment, receipt or return id.
#[derive(Debug, Deserialize)]
pub struct BusinessEventRequest {
    pub reference_id: Uuid,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl BusinessEventRequest {
    pub fn description_or(&self, default: impl FnOnce() -> String) -> String {
        self.description.clone().unwrap_or_else(default)
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub customer_id: CustomerId,
    pub balance: Decimal,
}

/// Result of recording a return; `entry` is absent when it was already
/// in the ledger
#[derive(Debug, Serialize)]
pub struct ReturnRecordedResponse {
    pub recorded: bool,
    pub entry: Option<LedgerEntry>,
}
