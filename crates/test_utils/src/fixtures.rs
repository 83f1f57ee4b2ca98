//! Pre-built Test Fixtures
//!
//! Ready-to-use amounts, dates and business records for ledger tests.
//! Values are fixed so expected balances can be written down by hand.

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{CustomerId, ReceiptId, ReturnId, SaleId};
use domain_receivables::{
    PendingCreditSource, ReceiptKind, ReceiptStatus, ReturnStatus, SaleRecord, SaleStatus,
    SalesReturn,
};

/// Fixture for amounts used across scenarios
pub struct AmountFixtures;

impl AmountFixtures {
    /// A typical credit sale
    pub fn sale() -> Decimal {
        dec!(1000.00)
    }

    /// A partial payment against [`sale`](Self::sale)
    pub fn partial_payment() -> Decimal {
        dec!(400.00)
    }

    /// A return smaller than the sale
    pub fn return_credit() -> Decimal {
        dec!(150.00)
    }

    /// Amount with sub-cent precision
    pub fn fractional() -> Decimal {
        dec!(33.3333)
    }
}

/// Fixture for business dates
pub struct DateFixtures;

impl DateFixtures {
    /// 10:00 UTC on the given day of January 2024
    pub fn january(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
    }

    /// 10:00 UTC on the given day of February 2024
    pub fn february(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, 10, 0, 0).unwrap()
    }
}

/// Fixture for human-readable strings
pub struct StringFixtures;

impl StringFixtures {
    /// A random company name
    pub fn customer_name() -> String {
        CompanyName().fake()
    }

    pub fn invoice_number(n: u32) -> String {
        format!("INV-{:05}", n)
    }

    pub fn return_number(n: u32) -> String {
        format!("RET-{:05}", n)
    }
}

/// Fixture for records owned by the surrounding subsystems
pub struct RecordFixtures;

impl RecordFixtures {
    /// An approved, unpaid sale
    pub fn approved_sale(
        customer_id: CustomerId,
        total: Decimal,
        sale_date: DateTime<Utc>,
    ) -> SaleRecord {
        SaleRecord {
            id: SaleId::new(),
            customer_id,
            invoice_number: StringFixtures::invoice_number(1),
            status: SaleStatus::Approved,
            total,
            paid: Decimal::ZERO,
            sale_date,
        }
    }

    /// An approved return
    pub fn approved_return(
        customer_id: CustomerId,
        total: Decimal,
        return_date: DateTime<Utc>,
    ) -> SalesReturn {
        SalesReturn {
            id: ReturnId::new(),
            customer_id,
            return_number: StringFixtures::return_number(1),
            total,
            status: ReturnStatus::Approved,
            return_date,
        }
    }

    /// A pending, return-driven receipt
    pub fn pending_return_receipt(
        customer_id: CustomerId,
        amount: Decimal,
        transaction_date: DateTime<Utc>,
    ) -> PendingCreditSource {
        PendingCreditSource {
            id: ReceiptId::new(),
            customer_id,
            amount,
            status: ReceiptStatus::Pending,
            kind: ReceiptKind::Return,
            return_id: None,
            description: "Refund due for returned goods".to_string(),
            transaction_date,
        }
    }
}
