//! Receivables Domain Ports
//!
//! Port interfaces for everything the ledger engine reads from or writes to.
//! The engine owns only [`LedgerStore`]; the other ports are read-only views
//! onto subsystems that own customers, sales, returns and receipts.
//!
//! # Implementations
//!
//! - **PostgreSQL**: `infra_db::adapters` (production)
//! - **In-memory**: [`crate::adapters::memory`] (tests, demos)
//!
//! ```rust,ignore
//! let ports = LedgerPorts {
//!     store: Arc::new(PostgresLedgerStore::new(pool.clone())),
//!     customers: records.clone(),
//!     reconciled_sources: vec![records.clone()],
//!     pending_credits: records.clone(),
//!     sales: records,
//! };
//! let service = ReceivablesService::new(ports, LedgerConfig::default());
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{
    CustomerId, DomainPort, HealthCheckable, PortError, ReceiptId, ReturnId, SaleId, TimeWindow,
};

use crate::entry::{EntryDirection, LedgerEntry, ReferenceType};

/// Sum of entry amounts for one `(customer, direction, reference type)` group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotal {
    pub customer_id: CustomerId,
    pub direction: EntryDirection,
    pub reference_type: ReferenceType,
    pub total: Decimal,
}

/// Append-only persistence of ledger entries
///
/// Implementations never update or delete an entry.
#[async_trait]
pub trait LedgerStore: DomainPort + HealthCheckable {
    /// The customer's most recently written entry
    async fn last_entry(&self, customer_id: CustomerId) -> Result<Option<LedgerEntry>, PortError>;

    /// Persists `entry`
    ///
    /// Must fail with `PortError::Conflict` unless `entry.sequence` is exactly
    /// one past the customer's current last sequence (1 for the first entry).
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError>;

    /// The customer's entries whose `transaction_date` falls in `window`,
    /// ordered by sequence
    async fn entries(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<LedgerEntry>, PortError>;

    /// Reference ids already written for the customer under `reference_type`
    async fn reference_ids(
        &self,
        customer_id: CustomerId,
        reference_type: ReferenceType,
    ) -> Result<HashSet<Uuid>, PortError>;

    /// Whole-history group sums for one customer
    async fn totals_for(&self, customer_id: CustomerId) -> Result<Vec<EntryTotal>, PortError>;

    /// Whole-history group sums for every customer, in one pass
    async fn totals(&self) -> Result<Vec<EntryTotal>, PortError>;
}

/// Customer as seen by the ledger: an id and a display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: CustomerId,
    pub name: String,
}

/// Read access to the customer catalog
#[async_trait]
pub trait CustomerDirectory: DomainPort {
    async fn exists(&self, customer_id: CustomerId) -> Result<bool, PortError>;

    /// Every customer, in display order
    async fn list_customers(&self) -> Result<Vec<CustomerRef>, PortError>;
}

/// An approved business event that must have a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    /// Becomes the entry's `reference_id`
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    /// Becomes the entry's `transaction_date`
    pub occurred_at: DateTime<Utc>,
    /// Human label, e.g. the return number
    pub label: String,
}

/// A class of events the reconciler checks against the ledger
///
/// Each source declares which reference type and direction its entries use;
/// the reconciler is otherwise agnostic of what the events are.
#[async_trait]
pub trait ReconciledEventSource: DomainPort {
    fn reference_type(&self) -> ReferenceType;

    fn direction(&self) -> EntryDirection;

    /// All approved events for the customer, whether or not they are in the ledger
    async fn approved_events(&self, customer_id: CustomerId) -> Result<Vec<SourceEvent>, PortError>;
}

/// Approval state of a sales return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

/// A sales return as recorded by the returns workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReturn {
    pub id: ReturnId,
    pub customer_id: CustomerId,
    pub return_number: String,
    pub total: Decimal,
    pub status: ReturnStatus,
    pub return_date: DateTime<Utc>,
}

impl SalesReturn {
    /// The event a reconciler expects to find in the ledger
    pub fn to_source_event(&self) -> SourceEvent {
        SourceEvent {
            id: *self.id.as_uuid(),
            customer_id: self.customer_id,
            amount: self.total,
            occurred_at: self.return_date,
            label: format!("Return {}", self.return_number),
        }
    }
}

/// Settlement state of a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Pending,
    Settled,
    Cancelled,
}

/// What a receipt was raised for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptKind {
    Return,
    Payment,
}

/// A receipt owed to the customer but not yet a confirmed ledger entry
///
/// Never persisted as a `LedgerEntry`; it only shapes the statement view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCreditSource {
    pub id: ReceiptId,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub status: ReceiptStatus,
    pub kind: ReceiptKind,
    /// The return this receipt settles, if any
    pub return_id: Option<ReturnId>,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
}

impl PendingCreditSource {
    /// Still pending and return-driven
    pub fn is_outstanding(&self) -> bool {
        self.status == ReceiptStatus::Pending && self.kind == ReceiptKind::Return
    }
}

/// Read access to open return-driven receipts
#[async_trait]
pub trait PendingCreditPort: DomainPort {
    /// Receipts with status PENDING and kind RETURN for the customer
    async fn pending_credits(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PendingCreditSource>, PortError>;
}

/// Lifecycle state of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Draft,
    Approved,
    Cancelled,
}

/// A sale as recorded by the sales subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: SaleId,
    pub customer_id: CustomerId,
    pub invoice_number: String,
    pub status: SaleStatus,
    pub total: Decimal,
    /// Amount already paid against this sale
    pub paid: Decimal,
    pub sale_date: DateTime<Utc>,
}

impl SaleRecord {
    pub fn outstanding(&self) -> Decimal {
        self.total.saturating_sub(self.paid)
    }
}

/// Read access to the sales subsystem
#[async_trait]
pub trait SalesPort: DomainPort {
    /// The customer's sales with `sale_date` in `window`, any status
    async fn sales(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<SaleRecord>, PortError>;
}

/// Everything the service needs wired in
#[derive(Clone)]
pub struct LedgerPorts {
    pub store: Arc<dyn LedgerStore>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub reconciled_sources: Vec<Arc<dyn ReconciledEventSource>>,
    pub pending_credits: Arc<dyn PendingCreditPort>,
    pub sales: Arc<dyn SalesPort>,
}
