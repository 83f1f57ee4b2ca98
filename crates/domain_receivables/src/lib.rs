//! Receivables Domain - Customer Ledger Engine
//!
//! This crate keeps an append-only ledger of debits and credits per customer
//! and derives everything an accounts-receivable screen needs from it.
//!
//! # Ledger Rules
//!
//! - Entries are never updated or deleted
//! - Each entry freezes the running balance after it:
//!   debit adds the amount, credit subtracts it, starting from zero
//! - A positive balance is money owed by the customer; a negative one is
//!   credit held for them
//!
//! # Components
//!
//! - **EntryWriter**: the only writer, serialized per customer
//! - **Reconciler**: backfills entries for approved events the ledger missed
//! - **PendingOverlay**: shows pending return credits without persisting them
//! - **AccountReader**: statements and balance reads
//! - **SummaryAggregator**: per-customer and fleet-wide totals
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_receivables::{ReceivablesService, LedgerConfig};
//! use core_kernel::DateRange;
//!
//! let service = ReceivablesService::new(ports, LedgerConfig::default());
//!
//! service.record_sale(customer_id, sale_id, dec!(1000), "Invoice 42", approved_at).await?;
//! service.record_payment(customer_id, payment_id, dec!(400), "Bank transfer", paid_at).await?;
//!
//! let statement = service.get_account(customer_id, DateRange::unbounded()).await?;
//! assert_eq!(statement.current_balance, dec!(600));
//! ```

pub mod adapters;
pub mod balance;
pub mod config;
pub mod entry;
pub mod error;
pub mod invoices;
pub mod overlay;
pub mod ports;
pub mod reconciler;
pub mod service;
pub mod statement;
pub mod summary;
pub mod writer;

pub use balance::{verify_chain, BalanceCalculator, ChainViolation};
pub use config::LedgerConfig;
pub use entry::{EntryDirection, EntryRequest, LedgerEntry, ReferenceType};
pub use error::LedgerError;
pub use invoices::OpenInvoice;
pub use overlay::{OverlayView, PendingOverlay, StatementLine, TransientEntry};
pub use ports::{
    CustomerDirectory, CustomerRef, EntryTotal, LedgerPorts, LedgerStore, PendingCreditPort,
    PendingCreditSource, ReceiptKind, ReceiptStatus, ReconciledEventSource, ReturnStatus,
    SaleRecord, SaleStatus, SalesPort, SalesReturn, SourceEvent,
};
pub use reconciler::{BackfillFailure, ReconciliationReport, Reconciler};
pub use service::{LedgerVerification, ReceivablesService};
pub use statement::{AccountReader, AccountStatement, StatementTotals};
pub use summary::{CustomerSummary, FleetTotals, SummaryAggregator};
pub use writer::{CustomerGuard, CustomerLocks, EntryWriter};
