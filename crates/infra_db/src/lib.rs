//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the receivables ledger using SQLx.
//!
//! # Architecture
//!
//! - **Repositories** own the SQL and row types
//! - **Adapters** implement the domain ports on top of the repositories
//! - **Migrations** are embedded and applied with [`run_migrations`]
//!
//! # Concurrency
//!
//! Appends take a transaction-scoped advisory lock keyed by customer and
//! re-check the chain head before inserting. The `(customer_id, sequence)`
//! unique key rejects anything that slips past. Both surface to the domain
//! as `PortError::Conflict`, which the entry writer retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/receivables")).await?;
//! run_migrations(&pool).await?;
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresBusinessRecords, PostgresLedgerStore};
pub use error::DatabaseError;
pub use pool::{
    create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR,
};
