//! Open invoices
//!
//! Approved sales the customer has not fully paid, used by the payment
//! screen to pick what a payment settles.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use core_kernel::SaleId;

use crate::ports::{SaleRecord, SaleStatus};

/// An approved sale with money still owed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenInvoice {
    pub sale_id: SaleId,
    pub invoice_number: String,
    pub sale_date: DateTime<Utc>,
    pub total: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
}

impl OpenInvoice {
    /// `None` unless the sale is approved and not fully paid
    pub fn from_sale(sale: SaleRecord) -> Option<Self> {
        let outstanding = sale.outstanding();
        if sale.status != SaleStatus::Approved || outstanding <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            sale_id: sale.id,
            invoice_number: sale.invoice_number,
            sale_date: sale.sale_date,
            total: sale.total,
            paid: sale.paid,
            outstanding,
        })
    }
}

/// Open invoices among `sales`, oldest first
pub fn open_invoices(sales: Vec<SaleRecord>) -> Vec<OpenInvoice> {
    let mut open: Vec<OpenInvoice> = sales.into_iter().filter_map(OpenInvoice::from_sale).collect();
    open.sort_by(|a, b| {
        a.sale_date
            .cmp(&b.sale_date)
            .then_with(|| a.invoice_number.cmp(&b.invoice_number))
    });
    open
}
