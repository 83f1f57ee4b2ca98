//! Ledger repository implementation
//!
//! Database access for `customer_ledger_entries`. Appends are serialized per
//! customer with a transaction-scoped advisory lock and re-check the chain
//! head inside that transaction, so two processes can never both write the
//! same sequence; the `(customer_id, sequence)` unique key backs this up.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const ENTRY_COLUMNS: &str = r#"
    entry_id, customer_id, sequence, direction, amount, balance,
    reference_type, reference_id, description, transaction_date, created_at
"#;

/// Repository for the append-only customer ledger
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The customer's highest-sequence entry
    pub async fn last_entry(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<LedgerEntryRow>, DatabaseError> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(&format!(
            "SELECT {} FROM customer_ledger_entries
             WHERE customer_id = $1
             ORDER BY sequence DESC
             LIMIT 1",
            ENTRY_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Inserts an entry if its sequence is the next one for the customer
    ///
    /// # Errors
    ///
    /// `DatabaseError::SequenceConflict` when the chain head moved since the
    /// caller read it.
    pub async fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntryRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(entry.customer_id)
            .execute(&mut *tx)
            .await?;

        let head: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(sequence) FROM customer_ledger_entries WHERE customer_id = $1",
        )
        .bind(entry.customer_id)
        .fetch_one(&mut *tx)
        .await?;

        let expected = head.unwrap_or(0) + 1;
        if entry.sequence != expected {
            return Err(DatabaseError::SequenceConflict {
                expected,
                attempted: entry.sequence,
            });
        }

        let row = sqlx::query_as::<_, LedgerEntryRow>(&format!(
            "INSERT INTO customer_ledger_entries (
                 entry_id, customer_id, sequence, direction, amount, balance,
                 reference_type, reference_id, description, transaction_date, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {}",
            ENTRY_COLUMNS
        ))
        .bind(entry.entry_id)
        .bind(entry.customer_id)
        .bind(entry.sequence)
        .bind(entry.direction)
        .bind(entry.amount)
        .bind(entry.balance)
        .bind(entry.reference_type)
        .bind(entry.reference_id)
        .bind(&entry.description)
        .bind(entry.transaction_date)
        .bind(entry.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Entries with `from <= transaction_date < until`, by sequence
    pub async fn entries(
        &self,
        customer_id: Uuid,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntryRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(&format!(
            "SELECT {} FROM customer_ledger_entries
             WHERE customer_id = $1
               AND ($2::timestamptz IS NULL OR transaction_date >= $2)
               AND ($3::timestamptz IS NULL OR transaction_date < $3)
             ORDER BY sequence",
            ENTRY_COLUMNS
        ))
        .bind(customer_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Reference ids recorded for the customer under one reference type
    pub async fn reference_ids(
        &self,
        customer_id: Uuid,
        reference_type: ReferenceType,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT reference_id FROM customer_ledger_entries
             WHERE customer_id = $1 AND reference_type = $2 AND reference_id IS NOT NULL",
        )
        .bind(customer_id)
        .bind(reference_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Amount sums grouped by customer, direction and reference type
    ///
    /// Restricted to one customer when `customer_id` is given.
    pub async fn totals(
        &self,
        customer_id: Option<Uuid>,
    ) -> Result<Vec<EntryTotalRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, EntryTotalRow>(
            "SELECT customer_id, direction, reference_type, SUM(amount) AS total
             FROM customer_ledger_entries
             WHERE ($1::uuid IS NULL OR customer_id = $1)
             GROUP BY customer_id, direction, reference_type",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Database row for a ledger entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub entry_id: Uuid,
    pub customer_id: Uuid,
    pub sequence: i64,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub balance: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a ledger entry
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub entry_id: Uuid,
    pub customer_id: Uuid,
    pub sequence: i64,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub balance: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One grouped sum
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryTotalRow {
    pub customer_id: Uuid,
    pub direction: EntryDirection,
    pub reference_type: ReferenceType,
    pub total: Decimal,
}

/// Database enum for entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "entry_direction", rename_all = "snake_case")]
pub enum EntryDirection {
    Debit,
    Credit,
}

/// Database enum for the originating business event
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ledger_reference_type", rename_all = "snake_case")]
pub enum ReferenceType {
    Sale,
    Payment,
    Return,
    GeneralReceipt,
    Adjustment,
}
