//! Business records repository
//!
//! Read-only access to the tables owned by the customer, sales, returns and
//! receipts subsystems.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for records the ledger reads but never writes
#[derive(Debug, Clone)]
pub struct BusinessRecordsRepository {
    pool: PgPool,
}

impl BusinessRecordsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn customer_exists(&self, customer_id: Uuid) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM customers WHERE customer_id = $1)",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// All customers ordered by name
    pub async fn list_customers(&self) -> Result<Vec<CustomerRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            "SELECT customer_id, name FROM customers ORDER BY name, customer_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn approved_returns(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<SalesReturnRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SalesReturnRow>(
            "SELECT return_id, customer_id, return_number, status, total, return_date
             FROM sales_returns
             WHERE customer_id = $1 AND status = 'approved'
             ORDER BY return_date, return_id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Receipts still pending for returned goods
    pub async fn pending_return_receipts(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<ReceiptRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ReceiptRow>(
            "SELECT receipt_id, customer_id, amount, status, kind, return_id, description,
                    transaction_date
             FROM receipts
             WHERE customer_id = $1 AND status = 'pending' AND kind = 'return'
             ORDER BY transaction_date, receipt_id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sales with `from <= sale_date < until`
    pub async fn sales(
        &self,
        customer_id: Uuid,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<SaleRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SaleRow>(
            "SELECT sale_id, customer_id, invoice_number, status, total, paid, sale_date
             FROM sales
             WHERE customer_id = $1
               AND ($2::timestamptz IS NULL OR sale_date >= $2)
               AND ($3::timestamptz IS NULL OR sale_date < $3)
             ORDER BY sale_date, sale_id",
        )
        .bind(customer_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub customer_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SaleRow {
    pub sale_id: Uuid,
    pub customer_id: Uuid,
    pub invoice_number: String,
    pub status: SaleStatus,
    pub total: Decimal,
    pub paid: Decimal,
    pub sale_date: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SalesReturnRow {
    pub return_id: Uuid,
    pub customer_id: Uuid,
    pub return_number: String,
    pub status: ReturnStatus,
    pub total: Decimal,
    pub return_date: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReceiptRow {
    pub receipt_id: Uuid,
    pub customer_id: Uuid,
    pub amount: Decimal,
    pub status: ReceiptStatus,
    pub kind: ReceiptKind,
    pub return_id: Option<Uuid>,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "sale_status", rename_all = "snake_case")]
pub enum SaleStatus {
    Draft,
    Approved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "return_status", rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "receipt_status", rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Settled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "receipt_kind", rename_all = "snake_case")]
pub enum ReceiptKind {
    Return,
    Payment,
}
