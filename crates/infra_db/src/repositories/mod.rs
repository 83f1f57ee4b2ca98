//! Repository implementations
//!
//! Repositories own the SQL and the row types; they know nothing about the
//! domain. Adapters translate between rows and domain types.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

pub mod ledger;
pub mod records;

pub use ledger::LedgerRepository;
pub use records::BusinessRecordsRepository;
