//! Ledger entry types
//!
//! A [`LedgerEntry`] is one immutable debit or credit against a customer's
//! account. Entries are only ever created by the `EntryWriter`, which freezes
//! the running balance into each one at write time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{CustomerId, LedgerEntryId};

/// Direction of an entry relative to what the customer owes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryDirection {
    /// Increases the amount owed (e.g. a credit sale)
    Debit,
    /// Decreases the amount owed (e.g. a payment or a return)
    Credit,
}

impl EntryDirection {
    /// Applies the direction's sign to a positive amount
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            EntryDirection::Debit => amount,
            EntryDirection::Credit => -amount,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryDirection::Debit => "DEBIT",
            EntryDirection::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBIT" => Ok(EntryDirection::Debit),
            "CREDIT" => Ok(EntryDirection::Credit),
            other => Err(format!("unknown entry direction: {}", other)),
        }
    }
}

/// The business event that produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    /// Approved credit sale
    Sale,
    /// Customer payment
    Payment,
    /// Approved sales return
    Return,
    /// Receipt not tied to a specific sale
    GeneralReceipt,
    /// Manual correction
    Adjustment,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 5] = [
        ReferenceType::Sale,
        ReferenceType::Payment,
        ReferenceType::Return,
        ReferenceType::GeneralReceipt,
        ReferenceType::Adjustment,
    ];

    /// Money actually collected from the customer
    ///
    /// Credits of these types count as payments in totals; every other
    /// credit (returns, adjustments) counts as an "other credit".
    pub fn is_collection(&self) -> bool {
        matches!(self, ReferenceType::Payment | ReferenceType::GeneralReceipt)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Sale => "SALE",
            ReferenceType::Payment => "PAYMENT",
            ReferenceType::Return => "RETURN",
            ReferenceType::GeneralReceipt => "GENERAL_RECEIPT",
            ReferenceType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown reference type: {}", s))
    }
}

/// One immutable record in a customer's ledger
///
/// # Invariants
///
/// - `amount` is strictly positive; the sign lives in `direction`
/// - `balance` equals the previous entry's balance plus the signed amount
///   (0 before the first entry)
/// - `sequence` starts at 1 and increases by one per customer, in write order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub customer_id: CustomerId,
    /// Position in the customer's chain, 1-based
    pub sequence: i64,
    pub direction: EntryDirection,
    pub amount: Decimal,
    /// Running balance after this entry
    pub balance: Decimal,
    pub reference_type: ReferenceType,
    /// Id of the originating sale, payment, return or receipt
    pub reference_id: Option<Uuid>,
    pub description: String,
    /// Business-effective date
    pub transaction_date: DateTime<Utc>,
    /// Write time
    pub created_at: DateTime<Utc>,
}

/// A request to append one entry to a customer's ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub customer_id: CustomerId,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub description: String,
    /// Defaults to the write time when absent
    pub transaction_date: Option<DateTime<Utc>>,
}

impl EntryRequest {
    /// Creates a request with an empty description and no reference id
    pub fn new(
        customer_id: CustomerId,
        direction: EntryDirection,
        amount: Decimal,
        reference_type: ReferenceType,
    ) -> Self {
        Self {
            customer_id,
            direction,
            amount,
            reference_type,
            reference_id: None,
            description: String::new(),
            transaction_date: None,
        }
    }

    /// A debit request
    pub fn debit(customer_id: CustomerId, amount: Decimal, reference_type: ReferenceType) -> Self {
        Self::new(customer_id, EntryDirection::Debit, amount, reference_type)
    }

    /// A credit request
    pub fn credit(customer_id: CustomerId, amount: Decimal, reference_type: ReferenceType) -> Self {
        Self::new(customer_id, EntryDirection::Credit, amount, reference_type)
    }

    /// Sets the originating record
    pub fn with_reference(mut self, reference_id: impl Into<Uuid>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the business-effective date
    pub fn dated(mut self, date: DateTime<Utc>) -> Self {
        self.transaction_date = Some(date);
        self
    }
}
