//! PostgreSQL Ledger Store Adapter
//!
//! Implements the domain's `LedgerStore` port over [`LedgerRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerStore;
//! use domain_receivables::LedgerStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool));
//! let last = store.last_entry(customer_id).await?;
//! ```

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, CustomerId, DomainPort, HealthCheckResult, HealthCheckable, LedgerEntryId,
    PortError, TimeWindow,
};
use domain_receivables::{EntryDirection, EntryTotal, LedgerEntry, LedgerStore, ReferenceType};

use crate::repositories::ledger::{
    EntryDirection as DbEntryDirection, EntryTotalRow, LedgerEntryRow, LedgerRepository,
    NewLedgerEntry, ReferenceType as DbReferenceType,
};

/// PostgreSQL-backed implementation of the `LedgerStore` port
///
/// Database errors are translated to `PortError`; a lost sequence race
/// (advisory-lock recheck or unique key) surfaces as `PortError::Conflict`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    repository: LedgerRepository,
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: LedgerRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &LedgerRepository {
        &self.repository
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-ledger-store").await
    }
}

/// Runs `SELECT 1` and times it
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };

    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn last_entry(&self, customer_id: CustomerId) -> Result<Option<LedgerEntry>, PortError> {
        let row = self.repository.last_entry(customer_id.into()).await?;
        Ok(row.map(row_to_entry))
    }

    #[instrument(
        skip(self, entry),
        fields(customer_id = %entry.customer_id, sequence = entry.sequence)
    )]
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError> {
        let row = self.repository.append(entry_to_new_row(entry)).await?;
        debug!(entry_id = %row.entry_id, "Ledger row inserted");
        Ok(row_to_entry(row))
    }

    #[instrument(skip(self, window), fields(customer_id = %customer_id))]
    async fn entries(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<LedgerEntry>, PortError> {
        let rows = self
            .repository
            .entries(customer_id.into(), window.from, window.until)
            .await?;
        debug!(count = rows.len(), "Fetched ledger entries");
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    async fn reference_ids(
        &self,
        customer_id: CustomerId,
        reference_type: ReferenceType,
    ) -> Result<HashSet<Uuid>, PortError> {
        let ids = self
            .repository
            .reference_ids(customer_id.into(), reference_type.into())
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn totals_for(&self, customer_id: CustomerId) -> Result<Vec<EntryTotal>, PortError> {
        let rows = self.repository.totals(Some(customer_id.into())).await?;
        Ok(rows.into_iter().map(row_to_total).collect())
    }

    #[instrument(skip(self))]
    async fn totals(&self) -> Result<Vec<EntryTotal>, PortError> {
        let rows = self.repository.totals(None).await?;
        debug!(groups = rows.len(), "Fetched fleet totals");
        Ok(rows.into_iter().map(row_to_total).collect())
    }
}

impl From<EntryDirection> for DbEntryDirection {
    fn from(direction: EntryDirection) -> Self {
        match direction {
            EntryDirection::Debit => DbEntryDirection::Debit,
            EntryDirection::Credit => DbEntryDirection::Credit,
        }
    }
}

impl From<DbEntryDirection> for EntryDirection {
    fn from(direction: DbEntryDirection) -> Self {
        match direction {
            DbEntryDirection::Debit => EntryDirection::Debit,
            DbEntryDirection::Credit => EntryDirection::Credit,
        }
    }
}

impl From<ReferenceType> for DbReferenceType {
    fn from(reference_type: ReferenceType) -> Self {
        match reference_type {
            ReferenceType::Sale => DbReferenceType::Sale,
            ReferenceType::Payment => DbReferenceType::Payment,
            ReferenceType::Return => DbReferenceType::Return,
            ReferenceType::GeneralReceipt => DbReferenceType::GeneralReceipt,
            ReferenceType::Adjustment => DbReferenceType::Adjustment,
        }
    }
}

impl From<DbReferenceType> for ReferenceType {
    fn from(reference_type: DbReferenceType) -> Self {
        match reference_type {
            DbReferenceType::Sale => ReferenceType::Sale,
            DbReferenceType::Payment => ReferenceType::Payment,
            DbReferenceType::Return => ReferenceType::Return,
            DbReferenceType::GeneralReceipt => ReferenceType::GeneralReceipt,
            DbReferenceType::Adjustment => ReferenceType::Adjustment,
        }
    }
}

fn row_to_entry(row: LedgerEntryRow) -> LedgerEntry {
    LedgerEntry {
        id: LedgerEntryId::from(row.entry_id),
        customer_id: CustomerId::from(row.customer_id),
        sequence: row.sequence,
        direction: row.direction.into(),
        amount: row.amount,
        balance: row.balance,
        reference_type: row.reference_type.into(),
        reference_id: row.reference_id,
        description: row.description,
        transaction_date: row.transaction_date,
        created_at: row.created_at,
    }
}

fn entry_to_new_row(entry: LedgerEntry) -> NewLedgerEntry {
    NewLedgerEntry {
        entry_id: entry.id.into(),
        customer_id: entry.customer_id.into(),
        sequence: entry.sequence,
        direction: entry.direction.into(),
        amount: entry.amount,
        balance: entry.balance,
        reference_type: entry.reference_type.into(),
        reference_id: entry.reference_id,
        description: entry.description,
        transaction_date: entry.transaction_date,
        created_at: entry.created_at,
    }
}

fn row_to_total(row: EntryTotalRow) -> EntryTotal {
    EntryTotal {
        customer_id: CustomerId::from(row.customer_id),
        direction: row.direction.into(),
        reference_type: row.reference_type.into(),
        total: row.total,
    }
}
