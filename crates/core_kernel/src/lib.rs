//! Core Kernel - Foundational types shared by the receivables ledger crates
//!
//! This crate provides the building blocks used by the domain, database and
//! API layers:
//! - Strongly-typed identifiers for customers, ledger entries and the
//!   business records that produce them
//! - Business date ranges resolved against a configured timezone
//! - Port error taxonomy and marker traits for hexagonal adapters

pub mod identifiers;
pub mod temporal;
pub mod ports;

pub use identifiers::{
    CustomerId, LedgerEntryId, SaleId, PaymentId, ReturnId, ReceiptId, AdjustmentId,
};
pub use temporal::{DateRange, TimeWindow, Timezone, TemporalError};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
