//! Account statements
//!
//! [`AccountReader`] assembles what a customer's account page shows: the
//! entries in a date range, whole-history totals, and the current balance
//! with pending return credits taken into account. Each read first gives the
//! reconciler a chance to backfill missing entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{instrument, warn};

use core_kernel::{CustomerId, DateRange, Timezone};

use crate::entry::{EntryDirection, LedgerEntry};
use crate::error::LedgerError;
use crate::overlay::{PendingOverlay, StatementLine};
use crate::ports::{
    CustomerDirectory, EntryTotal, LedgerStore, PendingCreditPort, PendingCreditSource,
};
use crate::reconciler::{ReconciliationReport, Reconciler};

/// Whole-history sums by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatementTotals {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Credits from payments and general receipts
    pub total_payments: Decimal,
    /// Credits from returns and adjustments
    pub total_other_credits: Decimal,
}

impl StatementTotals {
    /// Folds grouped sums into totals, `None` if a total overflows
    pub fn from_groups<'a>(groups: impl IntoIterator<Item = &'a EntryTotal>) -> Option<Self> {
        groups.into_iter().try_fold(Self::default(), |mut totals, group| {
            match group.direction {
                EntryDirection::Debit => {
                    totals.total_debit = totals.total_debit.checked_add(group.total)?;
                }
                EntryDirection::Credit => {
                    totals.total_credit = totals.total_credit.checked_add(group.total)?;
                    if group.reference_type.is_collection() {
                        totals.total_payments = totals.total_payments.checked_add(group.total)?;
                    } else {
                        totals.total_other_credits =
                            totals.total_other_credits.checked_add(group.total)?;
                    }
                }
            }
            Some(totals)
        })
    }

    /// Debits minus credits
    pub fn net(&self) -> Decimal {
        self.total_debit - self.total_credit
    }
}

/// A customer's statement for a date range
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatement {
    pub customer_id: CustomerId,
    pub range: DateRange,
    /// Newest first; transient lines only when dated inside `range`
    pub lines: Vec<StatementLine>,
    /// Confirmed entries only, whole history regardless of `range`
    pub totals: StatementTotals,
    /// Balance of the last confirmed entry
    pub confirmed_balance: Decimal,
    /// All pending return credits, regardless of `range`
    pub pending_total: Decimal,
    /// `confirmed_balance - pending_total`
    pub current_balance: Decimal,
    pub reconciliation: ReconciliationReport,
    pub generated_at: DateTime<Utc>,
}

impl AccountStatement {
    /// Confirmed entries in the statement, newest first
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.lines.iter().filter_map(|line| match line {
            StatementLine::Confirmed(entry) => Some(entry),
            StatementLine::Transient(_) => None,
        })
    }
}

/// Builds statements and balance reads
#[derive(Clone)]
pub struct AccountReader {
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerDirectory>,
    pending: Arc<dyn PendingCreditPort>,
    reconciler: Reconciler,
    timezone: Timezone,
}

impl AccountReader {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        customers: Arc<dyn CustomerDirectory>,
        pending: Arc<dyn PendingCreditPort>,
        reconciler: Reconciler,
        timezone: Timezone,
    ) -> Self {
        Self {
            store,
            customers,
            pending,
            reconciler,
            timezone,
        }
    }

    /// Reconciles, then reads the statement
    ///
    /// Backfill failures do not fail the read; they are logged and carried
    /// in [`AccountStatement::reconciliation`].
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_account(
        &self,
        customer_id: CustomerId,
        range: DateRange,
    ) -> Result<AccountStatement, LedgerError> {
        self.ensure_customer(customer_id).await?;

        let reconciliation = self.reconciler.reconcile(customer_id).await;
        if !reconciliation.is_clean() {
            warn!(
                failed = reconciliation.failures.len(),
                "Serving statement with unreconciled events"
            );
        }

        let window = range.to_window(&self.timezone);
        let entries = self.store.entries(customer_id, window).await?;
        let totals = StatementTotals::from_groups(&self.store.totals_for(customer_id).await?)
            .ok_or(LedgerError::BalanceOverflow(customer_id))?;
        let confirmed_balance = self.confirmed_balance(customer_id).await?;
        let pending = self.outstanding_credits(customer_id).await;

        let view = PendingOverlay::merge(entries, pending, confirmed_balance)
            .ok_or(LedgerError::BalanceOverflow(customer_id))?;
        let lines = view
            .lines
            .into_iter()
            .filter(|line| !line.is_transient() || window.contains(line.transaction_date()))
            .collect();

        Ok(AccountStatement {
            customer_id,
            range,
            lines,
            totals,
            confirmed_balance,
            pending_total: view.pending_total,
            current_balance: view.display_balance,
            reconciliation,
            generated_at: Utc::now(),
        })
    }

    /// Balance of the customer's last confirmed entry, 0 when there is none
    ///
    /// Reads a single entry; does not reconcile or apply pending credits.
    pub async fn get_current_balance(
        &self,
        customer_id: CustomerId,
    ) -> Result<Decimal, LedgerError> {
        self.ensure_customer(customer_id).await?;
        self.confirmed_balance(customer_id).await
    }

    async fn ensure_customer(&self, customer_id: CustomerId) -> Result<(), LedgerError> {
        if self.customers.exists(customer_id).await? {
            Ok(())
        } else {
            Err(LedgerError::CustomerNotFound(customer_id))
        }
    }

    async fn confirmed_balance(&self, customer_id: CustomerId) -> Result<Decimal, LedgerError> {
        Ok(self
            .store
            .last_entry(customer_id)
            .await?
            .map_or(Decimal::ZERO, |entry| entry.balance))
    }

    /// Pending credits are advisory; an unreachable receipts subsystem
    /// degrades the statement to confirmed entries only.
    async fn outstanding_credits(&self, customer_id: CustomerId) -> Vec<PendingCreditSource> {
        match self.pending.pending_credits(customer_id).await {
            Ok(credits) => credits
                .into_iter()
                .filter(|credit| credit.customer_id == customer_id && credit.is_outstanding())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Pending credits unavailable, showing confirmed entries only");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ReferenceType;
    use rust_decimal_macros::dec;

    fn group(
        direction: EntryDirection,
        reference_type: ReferenceType,
        total: Decimal,
    ) -> EntryTotal {
        EntryTotal {
            customer_id: CustomerId::new(),
            direction,
            reference_type,
            total,
        }
    }

    #[test]
    fn test_totals_split_collections_from_other_credits() {
        let groups = vec![
            group(EntryDirection::Debit, ReferenceType::Sale, dec!(1000)),
            group(EntryDirection::Credit, ReferenceType::Payment, dec!(300)),
            group(EntryDirection::Credit, ReferenceType::GeneralReceipt, dec!(50)),
            group(EntryDirection::Credit, ReferenceType::Return, dec!(100)),
            group(EntryDirection::Credit, ReferenceType::Adjustment, dec!(20)),
            group(EntryDirection::Debit, ReferenceType::Adjustment, dec!(5)),
        ];

        let totals = StatementTotals::from_groups(&groups).unwrap();

        assert_eq!(totals.total_debit, dec!(1005));
        assert_eq!(totals.total_credit, dec!(470));
        assert_eq!(totals.total_payments, dec!(350));
        assert_eq!(totals.total_other_credits, dec!(120));
        assert_eq!(totals.net(), dec!(535));
    }

    #[test]
    fn test_totals_overflow_is_reported() {
        let groups = vec![
            group(EntryDirection::Debit, ReferenceType::Sale, Decimal::MAX),
            group(EntryDirection::Debit, ReferenceType::Adjustment, Decimal::MAX),
        ];

        assert!(StatementTotals::from_groups(&groups).is_none());
    }
}
