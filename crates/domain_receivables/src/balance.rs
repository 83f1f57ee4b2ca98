//! Running balance arithmetic
//!
//! [`BalanceCalculator`] is the single place the ledger's balance rule lives.
//! It is pure so the chain invariant can be checked without a store, which is
//! what [`verify_chain`] does for stored history.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::entry::{EntryDirection, LedgerEntry};

/// Computes running balances
///
/// - Debit: `previous + amount`
/// - Credit: `previous - amount`
///
/// Callers reject non-positive amounts before getting here.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// `None` when the result falls outside the `Decimal` range
    pub fn next(previous: Decimal, amount: Decimal, direction: EntryDirection) -> Option<Decimal> {
        previous.checked_add(direction.signed(amount))
    }
}

/// First point where stored history disagrees with the balance rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainViolation {
    /// Sequence of the offending entry
    pub sequence: i64,
    /// Sequence that entry should have carried
    pub expected_sequence: i64,
    /// Balance the rule produces, `None` if applying the entry overflows
    pub expected_balance: Option<Decimal>,
    /// Balance frozen in the entry
    pub recorded_balance: Decimal,
}

/// Walks entries in write order and checks each frozen balance and sequence
///
/// `entries` must be one customer's complete history ordered by sequence.
pub fn verify_chain(entries: &[LedgerEntry]) -> Result<(), ChainViolation> {
    let mut previous = Decimal::ZERO;
    for (position, entry) in entries.iter().enumerate() {
        let expected_sequence = position as i64 + 1;
        let expected_balance = BalanceCalculator::next(previous, entry.amount, entry.direction);
        if entry.sequence != expected_sequence || expected_balance != Some(entry.balance) {
            return Err(ChainViolation {
                sequence: entry.sequence,
                expected_sequence,
                expected_balance,
                recorded_balance: entry.balance,
            });
        }
        previous = entry.balance;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_increases_balance() {
        assert_eq!(
            BalanceCalculator::next(dec!(600), dec!(150), EntryDirection::Debit),
            Some(dec!(750))
        );
    }

    #[test]
    fn test_credit_decreases_balance() {
        assert_eq!(
            BalanceCalculator::next(dec!(600), dec!(150), EntryDirection::Credit),
            Some(dec!(450))
        );
    }

    #[test]
    fn test_credit_can_go_below_zero() {
        assert_eq!(
            BalanceCalculator::next(dec!(0), dec!(25.50), EntryDirection::Credit),
            Some(dec!(-25.50))
        );
    }

    #[test]
    fn test_first_entry_starts_from_zero() {
        assert_eq!(
            BalanceCalculator::next(Decimal::ZERO, dec!(1000), EntryDirection::Debit),
            Some(dec!(1000))
        );
    }

    #[test]
    fn test_overflow_is_reported_not_panicked() {
        assert_eq!(
            BalanceCalculator::next(Decimal::MAX, Decimal::ONE, EntryDirection::Debit),
            None
        );
        assert_eq!(
            BalanceCalculator::next(Decimal::MIN, Decimal::ONE, EntryDirection::Credit),
            None
        );
    }
}
