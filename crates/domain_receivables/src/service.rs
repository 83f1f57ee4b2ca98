//! Receivables service
//!
//! Single entry point for callers: event recorders (sales approval, payment
//! capture, returns approval), the account pages, and operators. It wires the
//! writer, reconciler, reader and aggregator over one set of ports.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use core_kernel::{
    AdjustmentId, CustomerId, DateRange, HealthCheckResult, PaymentId, ReceiptId, ReturnId, SaleId,
    TimeWindow, Timezone,
};

use crate::balance::{verify_chain, ChainViolation};
use crate::config::LedgerConfig;
use crate::entry::{EntryDirection, EntryRequest, LedgerEntry, ReferenceType};
use crate::error::LedgerError;
use crate::invoices::{open_invoices, OpenInvoice};
use crate::ports::{CustomerDirectory, LedgerPorts, LedgerStore, SalesPort};
use crate::reconciler::{ReconciliationReport, Reconciler};
use crate::statement::{AccountReader, AccountStatement};
use crate::summary::{CustomerSummary, FleetTotals, SummaryAggregator};
use crate::writer::EntryWriter;

/// Result of re-walking a customer's stored chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerVerification {
    pub customer_id: CustomerId,
    pub entry_count: usize,
    pub current_balance: Decimal,
    /// First inconsistency found, if any
    pub violation: Option<ChainViolation>,
}

impl LedgerVerification {
    pub fn is_valid(&self) -> bool {
        self.violation.is_none()
    }
}

/// Facade over the receivables ledger
#[derive(Clone)]
pub struct ReceivablesService {
    writer: EntryWriter,
    reconciler: Reconciler,
    reader: AccountReader,
    aggregator: SummaryAggregator,
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerDirectory>,
    sales: Arc<dyn SalesPort>,
    timezone: Timezone,
}

impl ReceivablesService {
    pub fn new(ports: LedgerPorts, config: LedgerConfig) -> Self {
        let LedgerPorts {
            store,
            customers,
            reconciled_sources,
            pending_credits,
            sales,
        } = ports;

        let writer = EntryWriter::new(store.clone(), customers.clone(), &config);
        let reconciler = Reconciler::new(
            writer.clone(),
            store.clone(),
            customers.clone(),
            reconciled_sources,
            &config,
        );
        let reader = AccountReader::new(
            store.clone(),
            customers.clone(),
            pending_credits,
            reconciler.clone(),
            config.business_timezone,
        );
        let aggregator = SummaryAggregator::new(store.clone(), customers.clone());

        Self {
            writer,
            reconciler,
            reader,
            aggregator,
            store,
            customers,
            sales,
            timezone: config.business_timezone,
        }
    }

    /// Appends an arbitrary entry
    pub async fn append(&self, request: EntryRequest) -> Result<LedgerEntry, LedgerError> {
        self.writer.append(request).await
    }

    /// Debits an approved credit sale
    pub async fn record_sale(
        &self,
        customer_id: CustomerId,
        sale_id: SaleId,
        amount: Decimal,
        description: impl Into<String>,
        approved_at: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.writer
            .append(
                EntryRequest::debit(customer_id, amount, ReferenceType::Sale)
                    .with_reference(sale_id)
                    .with_description(description)
                    .dated(approved_at),
            )
            .await
    }

    /// Credits a payment against the customer's account
    pub async fn record_payment(
        &self,
        customer_id: CustomerId,
        payment_id: PaymentId,
        amount: Decimal,
        description: impl Into<String>,
        paid_at: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.writer
            .append(
                EntryRequest::credit(customer_id, amount, ReferenceType::Payment)
                    .with_reference(payment_id)
                    .with_description(description)
                    .dated(paid_at),
            )
            .await
    }

    /// Credits money received without a specific sale
    pub async fn record_general_receipt(
        &self,
        customer_id: CustomerId,
        receipt_id: ReceiptId,
        amount: Decimal,
        description: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.writer
            .append(
                EntryRequest::credit(customer_id, amount, ReferenceType::GeneralReceipt)
                    .with_reference(receipt_id)
                    .with_description(description)
                    .dated(received_at),
            )
            .await
    }

    /// Credits an approved return, once
    ///
    /// Returns `None` if the return is already in the ledger, e.g. because
    /// the reconciler backfilled it first.
    pub async fn record_return(
        &self,
        customer_id: CustomerId,
        return_id: ReturnId,
        amount: Decimal,
        description: impl Into<String>,
        approved_at: DateTime<Utc>,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        self.writer
            .append_unique(
                EntryRequest::credit(customer_id, amount, ReferenceType::Return)
                    .with_reference(return_id)
                    .with_description(description)
                    .dated(approved_at),
            )
            .await
    }

    /// Manual correction in either direction, effective now
    pub async fn record_adjustment(
        &self,
        customer_id: CustomerId,
        adjustment_id: AdjustmentId,
        direction: EntryDirection,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<LedgerEntry, LedgerError> {
        self.writer
            .append(
                EntryRequest::new(customer_id, direction, amount, ReferenceType::Adjustment)
                    .with_reference(adjustment_id)
                    .with_description(description),
            )
            .await
    }

    pub async fn get_account(
        &self,
        customer_id: CustomerId,
        range: DateRange,
    ) -> Result<AccountStatement, LedgerError> {
        self.reader.get_account(customer_id, range).await
    }

    pub async fn get_current_balance(
        &self,
        customer_id: CustomerId,
    ) -> Result<Decimal, LedgerError> {
        self.reader.get_current_balance(customer_id).await
    }

    pub async fn get_all_summaries(&self) -> Result<Vec<CustomerSummary>, LedgerError> {
        self.aggregator.get_all_summaries().await
    }

    pub async fn get_fleet_totals(&self) -> Result<FleetTotals, LedgerError> {
        self.aggregator.get_fleet_totals().await
    }

    /// Approved, not fully paid sales dated in `range`, oldest first
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_open_invoices(
        &self,
        customer_id: CustomerId,
        range: DateRange,
    ) -> Result<Vec<OpenInvoice>, LedgerError> {
        if !self.customers.exists(customer_id).await? {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }
        let sales = self.sales.sales(customer_id, range.to_window(&self.timezone)).await?;
        Ok(open_invoices(
            sales.into_iter().filter(|s| s.customer_id == customer_id).collect(),
        ))
    }

    pub async fn reconcile(
        &self,
        customer_id: CustomerId,
    ) -> Result<ReconciliationReport, LedgerError> {
        if !self.customers.exists(customer_id).await? {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }
        Ok(self.reconciler.reconcile(customer_id).await)
    }

    pub async fn reconcile_all(&self) -> Result<Vec<ReconciliationReport>, LedgerError> {
        self.reconciler.reconcile_all().await
    }

    /// Re-walks the customer's stored chain against the balance rule
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn verify_ledger(
        &self,
        customer_id: CustomerId,
    ) -> Result<LedgerVerification, LedgerError> {
        if !self.customers.exists(customer_id).await? {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }
        let entries = self.store.entries(customer_id, TimeWindow::all()).await?;
        let violation = verify_chain(&entries).err();
        if let Some(v) = &violation {
            tracing::error!(
                sequence = v.sequence,
                expected = ?v.expected_balance,
                recorded = %v.recorded_balance,
                "Ledger chain is inconsistent"
            );
        }

        Ok(LedgerVerification {
            customer_id,
            entry_count: entries.len(),
            current_balance: entries.last().map_or(Decimal::ZERO, |e| e.balance),
            violation,
        })
    }

    /// Health of the ledger store
    pub async fn health(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}
