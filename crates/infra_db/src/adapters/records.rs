//! PostgreSQL Business Records Adapter
//!
//! Serves the domain's read-only ports (customers, approved returns,
//! pending receipts, sales) from the tables of the surrounding subsystems.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    CustomerId, DomainPort, HealthCheckResult, HealthCheckable, PortError, ReceiptId, ReturnId,
    SaleId, TimeWindow,
};
use domain_receivables::{
    CustomerDirectory, CustomerRef, EntryDirection, PendingCreditPort, PendingCreditSource,
    ReceiptKind, ReceiptStatus, ReconciledEventSource, ReferenceType, ReturnStatus, SaleRecord,
    SaleStatus, SalesPort, SalesReturn, SourceEvent,
};

use crate::adapters::ledger::ping;
use crate::repositories::records::{
    BusinessRecordsRepository, ReceiptKind as DbReceiptKind, ReceiptRow,
    ReceiptStatus as DbReceiptStatus, ReturnStatus as DbReturnStatus, SaleRow,
    SaleStatus as DbSaleStatus, SalesReturnRow,
};

/// PostgreSQL-backed customers, sales, returns and receipts
///
/// Approved returns are its reconciled events: each must have a RETURN
/// credit in the ledger.
#[derive(Debug, Clone)]
pub struct PostgresBusinessRecords {
    repository: BusinessRecordsRepository,
    pool: PgPool,
}

impl PostgresBusinessRecords {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BusinessRecordsRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresBusinessRecords {}

#[async_trait]
impl HealthCheckable for PostgresBusinessRecords {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-business-records").await
    }
}

#[async_trait]
impl CustomerDirectory for PostgresBusinessRecords {
    async fn exists(&self, customer_id: CustomerId) -> Result<bool, PortError> {
        Ok(self.repository.customer_exists(customer_id.into()).await?)
    }

    #[instrument(skip(self))]
    async fn list_customers(&self) -> Result<Vec<CustomerRef>, PortError> {
        let rows = self.repository.list_customers().await?;
        debug!(count = rows.len(), "Fetched customers");
        Ok(rows
            .into_iter()
            .map(|row| CustomerRef {
                id: CustomerId::from(row.customer_id),
                name: row.name,
            })
            .collect())
    }
}

#[async_trait]
impl ReconciledEventSource for PostgresBusinessRecords {
    fn reference_type(&self) -> ReferenceType {
        ReferenceType::Return
    }

    fn direction(&self) -> EntryDirection {
        EntryDirection::Credit
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn approved_events(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<SourceEvent>, PortError> {
        let rows = self.repository.approved_returns(customer_id.into()).await?;
        Ok(rows
            .into_iter()
            .map(|row| row_to_return(row).to_source_event())
            .collect())
    }
}

#[async_trait]
impl PendingCreditPort for PostgresBusinessRecords {
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    async fn pending_credits(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PendingCreditSource>, PortError> {
        let rows = self.repository.pending_return_receipts(customer_id.into()).await?;
        Ok(rows.into_iter().map(row_to_receipt).collect())
    }
}

#[async_trait]
impl SalesPort for PostgresBusinessRecords {
    #[instrument(skip(self, window), fields(customer_id = %customer_id))]
    async fn sales(
        &self,
        customer_id: CustomerId,
        window: TimeWindow,
    ) -> Result<Vec<SaleRecord>, PortError> {
        let rows = self
            .repository
            .sales(customer_id.into(), window.from, window.until)
            .await?;
        Ok(rows.into_iter().map(row_to_sale).collect())
    }
}

fn row_to_return(row: SalesReturnRow) -> SalesReturn {
    SalesReturn {
        id: ReturnId::from(row.return_id),
        customer_id: CustomerId::from(row.customer_id),
        return_number: row.return_number,
        total: row.total,
        status: match row.status {
            DbReturnStatus::Pending => ReturnStatus::Pending,
            DbReturnStatus::Approved => ReturnStatus::Approved,
            DbReturnStatus::Rejected => ReturnStatus::Rejected,
        },
        return_date: row.return_date,
    }
}

fn row_to_receipt(row: ReceiptRow) -> PendingCreditSource {
    PendingCreditSource {
        id: ReceiptId::from(row.receipt_id),
        customer_id: CustomerId::from(row.customer_id),
        amount: row.amount,
        status: match row.status {
            DbReceiptStatus::Pending => ReceiptStatus::Pending,
            DbReceiptStatus::Settled => ReceiptStatus::Settled,
            DbReceiptStatus::Cancelled => ReceiptStatus::Cancelled,
        },
        kind: match row.kind {
            DbReceiptKind::Return => ReceiptKind::Return,
            DbReceiptKind::Payment => ReceiptKind::Payment,
        },
        return_id: row.return_id.map(ReturnId::from),
        description: row.description,
        transaction_date: row.transaction_date,
    }
}

fn row_to_sale(row: SaleRow) -> SaleRecord {
    SaleRecord {
        id: SaleId::from(row.sale_id),
        customer_id: CustomerId::from(row.customer_id),
        invoice_number: row.invoice_number,
        status: match row.status {
            DbSaleStatus::Draft => SaleStatus::Draft,
            DbSaleStatus::Approved => SaleStatus::Approved,
            DbSaleStatus::Cancelled => SaleStatus::Cancelled,
        },
        total: row.total,
        paid: row.paid,
        sale_date: row.sale_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_receipt_row_maps_to_outstanding_credit() {
        let row = ReceiptRow {
            receipt_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            amount: dec!(75.50),
            status: DbReceiptStatus::Pending,
            kind: DbReceiptKind::Return,
            return_id: Some(Uuid::new_v4()),
            description: "Refund".to_string(),
            transaction_date: Utc::now(),
        };

        let credit = row_to_receipt(row);

        assert!(credit.is_outstanding());
        assert_eq!(credit.amount, dec!(75.50));
        assert!(credit.return_id.is_some());
    }

    #[test]
    fn test_return_row_becomes_source_event() {
        let return_id = Uuid::new_v4();
        let row = SalesReturnRow {
            return_id,
            customer_id: Uuid::new_v4(),
            return_number: "RET-00042".to_string(),
            status: DbReturnStatus::Approved,
            total: dec!(120),
            return_date: Utc::now(),
        };

        let event = row_to_return(row).to_source_event();

        assert_eq!(event.id, return_id);
        assert_eq!(event.amount, dec!(120));
        assert!(event.label.contains("RET-00042"));
    }
}
