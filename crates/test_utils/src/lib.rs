//! Test Utilities Crate
//!
//! Shared test infrastructure for the receivables ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built amounts, dates and business records
//! - `builders`: [`TestLedger`], a service wired over in-memory adapters
//! - `doubles`: Port decorators that inject conflicts and outages
//! - `database`: PostgreSQL testcontainer with migrations applied
//! - `assertions`: Ledger-specific assertion helpers
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod doubles;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
