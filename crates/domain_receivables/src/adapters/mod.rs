//! Port adapters shipped with the domain crate
//!
//! Only in-memory implementations live here; the PostgreSQL adapters are in
//! `infra_db`.
//!
//! - **InMemoryLedgerStore**: append-only entry store with the same sequence
//!   conflict behaviour as the database
//! - **InMemoryBusinessRecords**: customers, sales, returns and receipts
//!   behind every read-only port

pub mod memory;

pub use memory::{InMemoryBusinessRecords, InMemoryLedgerStore};
