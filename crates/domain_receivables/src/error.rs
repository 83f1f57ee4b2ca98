//! Receivables ledger errors

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use core_kernel::{CustomerId, PortError, TemporalError};

/// Errors that can occur in the receivables ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Referenced customer does not exist
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// Amount was zero or negative
    #[error("Invalid amount: {0} (must be greater than zero)")]
    InvalidAmount(Decimal),

    /// Another writer kept winning the race for this customer's next entry
    #[error("Concurrent write conflict for {customer_id} after {attempts} attempts")]
    ConcurrencyConflict {
        customer_id: CustomerId,
        attempts: u32,
    },

    /// A balance or total for this customer would leave the `Decimal` range
    #[error("Balance for {0} is outside the representable range")]
    BalanceOverflow(CustomerId),

    /// Summing all customers' totals left the `Decimal` range
    #[error("Fleet totals are outside the representable range")]
    FleetTotalsOverflow,

    /// Some backfills of a reconciliation pass failed
    #[error("Reconciliation for {customer_id} left {} event(s) unreconciled", .reference_ids.len())]
    ReconciliationPartialFailure {
        customer_id: CustomerId,
        reference_ids: Vec<Uuid>,
    },

    /// A write was attempted under another customer's lock
    #[error("Lock held for {held} cannot be used to write for {requested}")]
    WrongCustomerGuard {
        held: CustomerId,
        requested: CustomerId,
    },

    /// Statement or invoice filter was malformed
    #[error("Invalid date range: {0}")]
    InvalidDateRange(#[from] TemporalError),

    /// Store or collaborator failure
    #[error(transparent)]
    Port(#[from] PortError),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::CustomerNotFound(_))
            || matches!(self, LedgerError::Port(e) if e.is_not_found())
    }
}
