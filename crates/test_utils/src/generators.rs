//! Property-Based Test Generators
//!
//! Proptest strategies for ledger inputs. Amounts are always positive
//! with at most four decimal places, like the amounts the engine accepts.

use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_receivables::{EntryDirection, ReferenceType};

/// Strategy for positive amounts with up to four decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64, 0u32..=4u32).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Strategy for amounts that must be rejected
pub fn non_positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64, 0u32..=2u32).prop_map(|(mantissa, scale)| -Decimal::new(mantissa, scale))
}

pub fn direction_strategy() -> impl Strategy<Value = EntryDirection> {
    prop_oneof![Just(EntryDirection::Debit), Just(EntryDirection::Credit)]
}

pub fn reference_type_strategy() -> impl Strategy<Value = ReferenceType> {
    prop::sample::select(ReferenceType::ALL.to_vec())
}

/// One requested write: direction, amount, reference type
pub fn entry_op_strategy() -> impl Strategy<Value = (EntryDirection, Decimal, ReferenceType)> {
    (direction_strategy(), amount_strategy(), reference_type_strategy())
}

/// A sequence of writes against one customer
pub fn entry_ops_strategy(
    max_len: usize,
) -> impl Strategy<Value = Vec<(EntryDirection, Decimal, ReferenceType)>> {
    prop::collection::vec(entry_op_strategy(), 0..=max_len)
}
