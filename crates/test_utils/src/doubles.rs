//! Port test doubles
//!
//! Wrappers around the in-memory adapters that fail on demand, for exercising
//! retry and partial-failure paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use core_kernel::{
    CustomerId, DomainPort, HealthCheckResult, HealthCheckable, PortError, TimeWindow,
};
use domain_receivables::adapters::InMemoryLedgerStore;
use domain_receivables::{
    EntryTotal, LedgerEntry, LedgerStore, PendingCreditPort, PendingCreditSource, ReferenceType,
};

/// Ledger store that can be told to lose sequence races or reject
/// specific references
#[derive(Debug, Clone, Default)]
pub struct FlakyLedgerStore {
    inner: InMemoryLedgerStore,
    conflicts_remaining: Arc<AtomicU32>,
    rejected_references: Arc<RwLock<HashSet<Uuid>>>,
}

impl FlakyLedgerStore {
    pub fn new(inner: InMemoryLedgerStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// The next `count` appends fail with a conflict
    pub fn conflict_next(&self, count: u32) {
        self.conflicts_remaining.store(count, Ordering::SeqCst);
    }

    /// Appends carrying `reference_id` fail with a connection error
    pub async fn reject_reference(&self, reference_id: impl Into<Uuid>) {
        self.rejected_references.write().await.insert(reference_id.into());
    }

    /// Stops rejecting every reference
    pub async fn heal(&self) {
        self.rejected_references.write().await.clear();
    }
}

impl DomainPort for FlakyLedgerStore {}

#[async_trait]
impl HealthCheckable for FlakyLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl LedgerStore for FlakyLedgerStore {
    async fn last_entry(&self, customer_id: CustomerId) -> Result<Option<LedgerEntry>, PortError> {
        self.inner.last_entry(customer_id).await
    }

    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError> {
        let took_conflict = self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took_conflict {
            return Err(PortError::conflict(format!("sequence {} taken", entry.sequence)));
        }

        if let Some(reference_id) = entry.reference_id {
            if self.rejected_references.read().await.contains(&reference_id) {
                return Err(PortError::connection(format!(
                    "store unavailable for {}",
                    reference_id
                )));
            }
        }

        self.inner.append(entry).await
    }

    async fn entries(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<LedgerEntry>, PortError> {
        self.inner.entries(customer_id, window).await
    }

    async fn reference_ids(
        &self,
        customer_id: CustomerId,
        reference_type: ReferenceType,
    ) -> Result<HashSet<Uuid>, PortError> {
        self.inner.reference_ids(customer_id, reference_type).await
    }

    async fn totals_for(&self, customer_id: CustomerId) -> Result<Vec<EntryTotal>, PortError> {
        self.inner.totals_for(customer_id).await
    }

    async fn totals(&self) -> Result<Vec<EntryTotal>, PortError> {
        self.inner.totals().await
    }
}

/// Receipts subsystem that is always down
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePendingCredits;

impl DomainPort for UnavailablePendingCredits {}

#[async_trait]
impl PendingCreditPort for UnavailablePendingCredits {
    async fn pending_credits(
        &self,
        _customer_id: CustomerId,
    ) -> Result<Vec<PendingCreditSource>, PortError> {
        Err(PortError::connection("receipts service unreachable"))
    }
}
