//! Test Harness Builders
//!
//! [`TestLedger`] wires a [`ReceivablesService`] over the in-memory adapters
//! and offers shortcuts for the business events scenarios are made of.
//! Tests specify only what matters to them; everything else is defaulted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{CustomerId, PaymentId, TimeWindow};
use domain_receivables::adapters::{InMemoryBusinessRecords, InMemoryLedgerStore};
use domain_receivables::{
    LedgerConfig, LedgerEntry, LedgerPorts, LedgerStore, PendingCreditPort, PendingCreditSource,
    ReceivablesService, ReconciledEventSource, SaleRecord, SalesReturn,
};

use crate::doubles::FlakyLedgerStore;
use crate::fixtures::{RecordFixtures, StringFixtures};

/// Builder for [`TestLedger`]
pub struct TestLedgerBuilder {
    config: LedgerConfig,
    pending_credits: Option<Arc<dyn PendingCreditPort>>,
}

impl Default for TestLedgerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedgerBuilder {
    pub fn new() -> Self {
        Self {
            config: LedgerConfig::default(),
            pending_credits: None,
        }
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the receipts port
    pub fn with_pending_credits(mut self, port: Arc<dyn PendingCreditPort>) -> Self {
        self.pending_credits = Some(port);
        self
    }

    pub fn build(self) -> TestLedger {
        let memory = InMemoryLedgerStore::new();
        let store = Arc::new(memory.clone());
        self.assemble(memory, store)
    }

    /// Builds with a [`FlakyLedgerStore`] in front of the in-memory store,
    /// returning the handle that controls its failures
    pub fn build_flaky(self) -> (TestLedger, FlakyLedgerStore) {
        let memory = InMemoryLedgerStore::new();
        let flaky = FlakyLedgerStore::new(memory.clone());
        let ledger = self.assemble(memory, Arc::new(flaky.clone()));
        (ledger, flaky)
    }

    fn assemble(self, memory: InMemoryLedgerStore, store: Arc<dyn LedgerStore>) -> TestLedger {
        let records = InMemoryBusinessRecords::new();
        let shared = Arc::new(records.clone());
        let returns: Arc<dyn ReconciledEventSource> = shared.clone();
        let pending_credits: Arc<dyn PendingCreditPort> = match self.pending_credits {
            Some(port) => port,
            None => shared.clone(),
        };

        let ports = LedgerPorts {
            store,
            customers: shared.clone(),
            reconciled_sources: vec![returns],
            pending_credits,
            sales: shared,
        };

        TestLedger {
            memory,
            records,
            service: ReceivablesService::new(ports, self.config),
        }
    }
}

/// A receivables service over in-memory state
#[derive(Clone)]
pub struct TestLedger {
    /// The store underneath any test double
    pub memory: InMemoryLedgerStore,
    pub records: InMemoryBusinessRecords,
    pub service: ReceivablesService,
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedger {
    pub fn new() -> Self {
        TestLedgerBuilder::new().build()
    }

    pub fn builder() -> TestLedgerBuilder {
        TestLedgerBuilder::new()
    }

    /// Registers a customer with a generated name
    pub async fn customer(&self) -> CustomerId {
        self.records.add_customer(StringFixtures::customer_name()).await
    }

    /// Approves a sale in the sales subsystem and debits it
    pub async fn sale(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> LedgerEntry {
        let sale = RecordFixtures::approved_sale(customer_id, amount, at);
        self.record_sale(&sale).await
    }

    /// Debits an existing sale record, adding it to the sales subsystem
    pub async fn record_sale(&self, sale: &SaleRecord) -> LedgerEntry {
        self.records.add_sale(sale.clone()).await;
        self.service
            .record_sale(
                sale.customer_id,
                sale.id,
                sale.total,
                format!("Invoice {}", sale.invoice_number),
                sale.sale_date,
            )
            .await
            .unwrap()
    }

    /// Credits a payment
    pub async fn payment(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> LedgerEntry {
        self.service
            .record_payment(customer_id, PaymentId::new(), amount, "Payment received", at)
            .await
            .unwrap()
    }

    /// Approves a return without writing its ledger entry, as when the
    /// approval path skipped the write
    pub async fn approve_return_unrecorded(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> SalesReturn {
        let sales_return = RecordFixtures::approved_return(customer_id, amount, at);
        self.records.add_return(sales_return.clone()).await;
        sales_return
    }

    /// Approves a return and credits it through the normal path
    pub async fn approve_return(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> SalesReturn {
        let sales_return = self.approve_return_unrecorded(customer_id, amount, at).await;
        self.service
            .record_return(
                customer_id,
                sales_return.id,
                amount,
                format!("Return {}", sales_return.return_number),
                at,
            )
            .await
            .unwrap();
        sales_return
    }

    /// Adds a pending, return-driven receipt
    pub async fn pending_receipt(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> PendingCreditSource {
        let receipt = RecordFixtures::pending_return_receipt(customer_id, amount, at);
        self.records.add_receipt(receipt.clone()).await;
        receipt
    }

    /// The customer's full stored chain, in write order
    pub async fn entries(&self, customer_id: CustomerId) -> Vec<LedgerEntry> {
        self.memory.entries(customer_id, TimeWindow::all()).await.unwrap()
    }
}
