//! Domain Adapters
//!
//! PostgreSQL implementations of the receivables ports. Each adapter:
//! - Implements one or more port traits from `domain_receivables`
//! - Translates between domain types and repository row types
//! - Maps `DatabaseError` to `PortError`
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresBusinessRecords, PostgresLedgerStore};
//!
//! let store = Arc::new(PostgresLedgerStore::new(pool.clone()));
//! let records = Arc::new(PostgresBusinessRecords::new(pool));
//! ```

pub mod ledger;
pub mod records;

pub use ledger::PostgresLedgerStore;
pub use records::PostgresBusinessRecords;
