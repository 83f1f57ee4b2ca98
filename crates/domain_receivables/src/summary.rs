//! Fleet-wide receivables summaries
//!
//! One row per customer, derived from a single grouped read over the whole
//! ledger rather than one read per customer.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{instrument, warn};

use core_kernel::CustomerId;

use crate::entry::EntryDirection;
use crate::error::LedgerError;
use crate::ports::{CustomerDirectory, EntryTotal, LedgerStore};

/// A customer's receivables position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub customer_id: CustomerId,
    /// `None` when the ledger holds entries for a customer the directory
    /// no longer lists
    pub customer_name: Option<String>,
    pub total_debit: Decimal,
    /// Payments and general receipts
    pub total_payments: Decimal,
    /// Returns and credit adjustments
    pub total_returns: Decimal,
    pub total_credit: Decimal,
    pub current_balance: Decimal,
    /// Current balance floored at zero
    pub remaining_debt: Decimal,
}

impl CustomerSummary {
    fn empty(customer_id: CustomerId, customer_name: Option<String>) -> Self {
        Self {
            customer_id,
            customer_name,
            total_debit: Decimal::ZERO,
            total_payments: Decimal::ZERO,
            total_returns: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            remaining_debt: Decimal::ZERO,
        }
    }

    /// Adds one grouped sum; `None` if a total overflows
    fn add(&mut self, group: &EntryTotal) -> Option<()> {
        match group.direction {
            EntryDirection::Debit => self.total_debit = self.total_debit.checked_add(group.total)?,
            EntryDirection::Credit if group.reference_type.is_collection() => {
                self.total_payments = self.total_payments.checked_add(group.total)?
            }
            EntryDirection::Credit => {
                self.total_returns = self.total_returns.checked_add(group.total)?
            }
        }
        self.total_credit = self.total_payments.checked_add(self.total_returns)?;
        self.current_balance = self.total_debit - self.total_credit;
        self.remaining_debt = self.current_balance.max(Decimal::ZERO);
        Some(())
    }

    /// Customer holds a credit balance
    pub fn is_in_credit(&self) -> bool {
        self.current_balance < Decimal::ZERO
    }
}

/// Sums over a set of customer summaries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetTotals {
    pub customer_count: usize,
    pub total_debit: Decimal,
    pub total_payments: Decimal,
    pub total_returns: Decimal,
    pub total_credit: Decimal,
    pub total_balance: Decimal,
    pub total_remaining_debt: Decimal,
}

impl FleetTotals {
    /// `None` if any sum overflows
    pub fn from_summaries(summaries: &[CustomerSummary]) -> Option<Self> {
        summaries.iter().try_fold(
            Self {
                customer_count: summaries.len(),
                ..Self::default()
            },
            |mut totals, summary| {
                totals.total_debit = totals.total_debit.checked_add(summary.total_debit)?;
                totals.total_payments = totals.total_payments.checked_add(summary.total_payments)?;
                totals.total_returns = totals.total_returns.checked_add(summary.total_returns)?;
                totals.total_credit = totals.total_credit.checked_add(summary.total_credit)?;
                totals.total_balance = totals.total_balance.checked_add(summary.current_balance)?;
                totals.total_remaining_debt = totals
                    .total_remaining_debt
                    .checked_add(summary.remaining_debt)?;
                Some(totals)
            },
        )
    }
}

/// Builds per-customer summaries
#[derive(Clone)]
pub struct SummaryAggregator {
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerDirectory>,
}

impl SummaryAggregator {
    pub fn new(store: Arc<dyn LedgerStore>, customers: Arc<dyn CustomerDirectory>) -> Self {
        Self { store, customers }
    }

    /// One summary per directory customer, in directory order, including
    /// customers with no entries
    ///
    /// Customers with entries but missing from the directory are appended,
    /// ordered by id, so the fleet totals still match the ledger.
    #[instrument(skip(self))]
    pub async fn get_all_summaries(&self) -> Result<Vec<CustomerSummary>, LedgerError> {
        let customers = self.customers.list_customers().await?;
        let groups = self.store.totals().await?;

        let mut by_customer: HashMap<CustomerId, CustomerSummary> = customers
            .iter()
            .map(|c| (c.id, CustomerSummary::empty(c.id, Some(c.name.clone()))))
            .collect();

        for group in &groups {
            by_customer
                .entry(group.customer_id)
                .or_insert_with(|| CustomerSummary::empty(group.customer_id, None))
                .add(group)
                .ok_or(LedgerError::BalanceOverflow(group.customer_id))?;
        }

        let mut summaries: Vec<CustomerSummary> = customers
            .iter()
            .filter_map(|c| by_customer.remove(&c.id))
            .collect();

        if !by_customer.is_empty() {
            warn!(
                orphans = by_customer.len(),
                "Ledger holds entries for customers missing from the directory"
            );
            let mut orphans: Vec<CustomerSummary> = by_customer.into_values().collect();
            orphans.sort_by_key(|s| s.customer_id);
            summaries.extend(orphans);
        }

        Ok(summaries)
    }

    pub async fn get_fleet_totals(&self) -> Result<FleetTotals, LedgerError> {
        let summaries = self.get_all_summaries().await?;
        FleetTotals::from_summaries(&summaries).ok_or(LedgerError::FleetTotalsOverflow)
    }
}
