//! Custom Test Assertions
//!
//! Ledger-specific assertions that say which entry or field broke, rather
//! than dumping two whole structs.

use rust_decimal::Decimal;

use domain_receivables::{verify_chain, AccountStatement, CustomerSummary, LedgerEntry};

/// Asserts the chain is 1..=n in write order with every balance following
/// from the previous one
///
/// # Panics
///
/// Panics at the first entry that breaks the balance rule or the sequence
pub fn assert_chain_valid(entries: &[LedgerEntry]) {
    if let Err(violation) = verify_chain(entries) {
        panic!(
            "Ledger chain broken at sequence {} (expected sequence {}): \
             recorded balance {}, expected {:?}",
            violation.sequence,
            violation.expected_sequence,
            violation.recorded_balance,
            violation.expected_balance
        );
    }
}

/// Asserts the last entry's balance, or zero for an empty chain
pub fn assert_current_balance(entries: &[LedgerEntry], expected: Decimal) {
    let actual = entries.last().map_or(Decimal::ZERO, |e| e.balance);
    assert_eq!(
        actual, expected,
        "Current balance is {}, expected {}",
        actual, expected
    );
}

/// Asserts every summary field follows from the others
pub fn assert_summary_consistent(summary: &CustomerSummary) {
    assert_eq!(
        summary.total_credit,
        summary.total_payments + summary.total_returns,
        "Summary for {}: credit {} != payments {} + returns {}",
        summary.customer_id,
        summary.total_credit,
        summary.total_payments,
        summary.total_returns
    );
    assert_eq!(
        summary.current_balance,
        summary.total_debit - summary.total_credit,
        "Summary for {}: balance {} != debit {} - credit {}",
        summary.customer_id,
        summary.current_balance,
        summary.total_debit,
        summary.total_credit
    );
    assert_eq!(
        summary.remaining_debt,
        summary.current_balance.max(Decimal::ZERO),
        "Summary for {}: remaining debt {} for balance {}",
        summary.customer_id,
        summary.remaining_debt,
        summary.current_balance
    );
}

/// Asserts statement lines are newest first
pub fn assert_newest_first(statement: &AccountStatement) {
    for pair in statement.lines.windows(2) {
        assert!(
            pair[0].transaction_date() >= pair[1].transaction_date(),
            "Line dated {} is listed before older line dated {}",
            pair[1].transaction_date(),
            pair[0].transaction_date()
        );
    }
}
