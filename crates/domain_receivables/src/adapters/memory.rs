//! In-memory adapters
//!
//! Used by tests and local demos. State lives behind `tokio::sync::RwLock`
//! so the adapters can be shared across tasks exactly like the database ones.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use core_kernel::{
    CustomerId, DomainPort, HealthCheckResult, HealthCheckable, PortError, ReceiptId, ReturnId,
    SaleId, TimeWindow,
};

use crate::entry::{EntryDirection, LedgerEntry, ReferenceType};
use crate::ports::{
    CustomerDirectory, CustomerRef, EntryTotal, LedgerStore, PendingCreditPort,
    PendingCreditSource, ReceiptStatus, ReconciledEventSource, ReturnStatus, SaleRecord,
    SalesPort, SalesReturn, SourceEvent,
};

/// Append-only ledger held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    chains: Arc<RwLock<HashMap<CustomerId, Vec<LedgerEntry>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all customers
    pub async fn entry_count(&self) -> usize {
        self.chains.read().await.values().map(Vec::len).sum()
    }

    /// Writes an entry without any checks, for corrupt-history fixtures
    pub async fn insert_unchecked(&self, entry: LedgerEntry) {
        self.chains
            .write()
            .await
            .entry(entry.customer_id)
            .or_default()
            .push(entry);
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-ledger-store")
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn last_entry(&self, customer_id: CustomerId) -> Result<Option<LedgerEntry>, PortError> {
        Ok(self
            .chains
            .read()
            .await
            .get(&customer_id)
            .and_then(|chain| chain.last().cloned()))
    }

    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError> {
        let mut chains = self.chains.write().await;
        let chain = chains.entry(entry.customer_id).or_default();

        let expected = chain.last().map_or(1, |last| last.sequence + 1);
        if entry.sequence != expected {
            return Err(PortError::conflict(format!(
                "sequence {} for {} is taken, next is {}",
                entry.sequence, entry.customer_id, expected
            )));
        }

        chain.push(entry.clone());
        Ok(entry)
    }

    async fn entries(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<LedgerEntry>, PortError> {
        Ok(self
            .chains
            .read()
            .await
            .get(&customer_id)
            .map(|chain| {
                chain
                    .iter()
                    .filter(|e| window.contains(e.transaction_date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn reference_ids(
        &self,
        customer_id: CustomerId,
        reference_type: ReferenceType,
    ) -> Result<HashSet<Uuid>, PortError> {
        Ok(self
            .chains
            .read()
            .await
            .get(&customer_id)
            .map(|chain| {
                chain
                    .iter()
                    .filter(|e| e.reference_type == reference_type)
                    .filter_map(|e| e.reference_id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn totals_for(&self, customer_id: CustomerId) -> Result<Vec<EntryTotal>, PortError> {
        let chains = self.chains.read().await;
        group_totals(chains.get(&customer_id).into_iter().flatten())
    }

    async fn totals(&self) -> Result<Vec<EntryTotal>, PortError> {
        let chains = self.chains.read().await;
        group_totals(chains.values().flatten())
    }
}

fn group_totals<'a>(
    entries: impl Iterator<Item = &'a LedgerEntry>,
) -> Result<Vec<EntryTotal>, PortError> {
    let mut groups: HashMap<(CustomerId, EntryDirection, ReferenceType), Decimal> = HashMap::new();
    for entry in entries {
        let total = groups
            .entry((entry.customer_id, entry.direction, entry.reference_type))
            .or_default();
        *total = total.checked_add(entry.amount).ok_or_else(|| {
            PortError::internal(format!("Total for {} overflows", entry.customer_id))
        })?;
    }
    Ok(groups
        .into_iter()
        .map(|((customer_id, direction, reference_type), total)| EntryTotal {
            customer_id,
            direction,
            reference_type,
            total,
        })
        .collect())
}

/// Customers, sales, returns and receipts held in memory
///
/// Serves every read-only port; approved returns are its reconciled events.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBusinessRecords {
    customers: Arc<RwLock<Vec<CustomerRef>>>,
    sales: Arc<RwLock<Vec<SaleRecord>>>,
    returns: Arc<RwLock<Vec<SalesReturn>>>,
    receipts: Arc<RwLock<Vec<PendingCreditSource>>>,
}

impl InMemoryBusinessRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customer and returns its id
    pub async fn add_customer(&self, name: impl Into<String>) -> CustomerId {
        let customer = CustomerRef {
            id: CustomerId::new_v7(),
            name: name.into(),
        };
        let id = customer.id;
        self.customers.write().await.push(customer);
        id
    }

    pub async fn add_sale(&self, sale: SaleRecord) {
        self.sales.write().await.push(sale);
    }

    /// Adds `amount` to what has been paid against the sale
    pub async fn apply_sale_payment(
        &self,
        sale_id: SaleId,
        amount: Decimal,
    ) -> Result<(), PortError> {
        let mut sales = self.sales.write().await;
        let sale = sales
            .iter_mut()
            .find(|s| s.id == sale_id)
            .ok_or_else(|| PortError::not_found("Sale", sale_id))?;
        sale.paid = sale
            .paid
            .checked_add(amount)
            .ok_or_else(|| PortError::validation(format!("Payment overflows sale {}", sale_id)))?;
        Ok(())
    }

    pub async fn add_return(&self, sales_return: SalesReturn) {
        self.returns.write().await.push(sales_return);
    }

    pub async fn set_return_status(
        &self,
        return_id: ReturnId,
        status: ReturnStatus,
    ) -> Result<(), PortError> {
        let mut returns = self.returns.write().await;
        let sales_return = returns
            .iter_mut()
            .find(|r| r.id == return_id)
            .ok_or_else(|| PortError::not_found("Return", return_id))?;
        sales_return.status = status;
        Ok(())
    }

    pub async fn add_receipt(&self, receipt: PendingCreditSource) {
        self.receipts.write().await.push(receipt);
    }

    pub async fn set_receipt_status(
        &self,
        receipt_id: ReceiptId,
        status: ReceiptStatus,
    ) -> Result<(), PortError> {
        let mut receipts = self.receipts.write().await;
        let receipt = receipts
            .iter_mut()
            .find(|r| r.id == receipt_id)
            .ok_or_else(|| PortError::not_found("Receipt", receipt_id))?;
        receipt.status = status;
        Ok(())
    }
}

impl DomainPort for InMemoryBusinessRecords {}

#[async_trait]
impl CustomerDirectory for InMemoryBusinessRecords {
    async fn exists(&self, customer_id: CustomerId) -> Result<bool, PortError> {
        Ok(self.customers.read().await.iter().any(|c| c.id == customer_id))
    }

    async fn list_customers(&self) -> Result<Vec<CustomerRef>, PortError> {
        Ok(self.customers.read().await.clone())
    }
}

#[async_trait]
impl ReconciledEventSource for InMemoryBusinessRecords {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Return
    }

    fn direction(&self) -> EntryDirection {
        EntryDirection::Credit
    }

    async fn approved_events(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<SourceEvent>, PortError> {
        Ok(self
            .returns
            .read()
            .await
            .iter()
            .filter(|r| r.customer_id == customer_id && r.status == ReturnStatus::Approved)
            .map(SalesReturn::to_source_event)
            .collect())
    }
}

#[async_trait]
impl PendingCreditPort for InMemoryBusinessRecords {
    async fn pending_credits(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PendingCreditSource>, PortError> {
        Ok(self
            .receipts
            .read()
            .await
            .iter()
            .filter(|r| r.customer_id == customer_id && r.is_outstanding())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SalesPort for InMemoryBusinessRecords {
    async fn sales(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<SaleRecord>, PortError> {
        Ok(self
            .sales
            .read()
            .await
            .iter()
            .filter(|s| s.customer_id == customer_id && window.contains(s.sale_date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::LedgerEntryId;
    use rust_decimal_macros::dec;

    fn entry(customer_id: CustomerId, sequence: i64) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            customer_id,
            sequence,
            direction: EntryDirection::Debit,
            amount: dec!(10),
            balance: dec!(10) * Decimal::from(sequence),
            reference_type: ReferenceType::Sale,
            reference_id: Some(Uuid::new_v4()),
            description: String::new(),
            transaction_date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_requires_next_sequence() {
        let store = InMemoryLedgerStore::new();
        let customer = CustomerId::new();

        store.append(entry(customer, 1)).await.unwrap();
        let duplicate = store.append(entry(customer, 1)).await;
        let gap = store.append(entry(customer, 3)).await;

        assert!(duplicate.unwrap_err().is_conflict());
        assert!(gap.unwrap_err().is_conflict());
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_sequences_are_per_customer() {
        let store = InMemoryLedgerStore::new();
        store.append(entry(CustomerId::new(), 1)).await.unwrap();
        store.append(entry(CustomerId::new(), 1)).await.unwrap();

        assert_eq!(store.entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_totals_group_by_customer_direction_and_type() {
        let store = InMemoryLedgerStore::new();
        let customer = CustomerId::new();
        store.append(entry(customer, 1)).await.unwrap();
        store.append(entry(customer, 2)).await.unwrap();

        let totals = store.totals_for(customer).await.unwrap();

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total, dec!(20));
        assert!(store.totals_for(CustomerId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_outstanding_receipts_are_pending() {
        let records = InMemoryBusinessRecords::new();
        let customer = records.add_customer("Acme").await;
        let receipt = PendingCreditSource {
            id: ReceiptId::new(),
            customer_id: customer,
            amount: dec!(40),
            status: ReceiptStatus::Pending,
            kind: crate::ports::ReceiptKind::Return,
            return_id: None,
            description: "Return receipt".to_string(),
            transaction_date: Utc::now(),
        };
        records.add_receipt(receipt.clone()).await;
        assert_eq!(records.pending_credits(customer).await.unwrap().len(), 1);

        records.set_receipt_status(receipt.id, ReceiptStatus::Settled).await.unwrap();
        assert!(records.pending_credits(customer).await.unwrap().is_empty());
    }
}
