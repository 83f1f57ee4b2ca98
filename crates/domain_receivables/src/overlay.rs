//! Pending credit overlay
//!
//! A return whose receipt is still pending has not reduced what the customer
//! owes yet, but the statement should show it. The overlay merges such
//! receipts into the statement as transient lines that are never written to
//! the store.
//!
//! Transient lines are placed after the whole confirmed history, oldest
//! receipt first, so their running balances continue from the confirmed
//! current balance.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::BalanceCalculator;
use crate::entry::{EntryDirection, LedgerEntry, ReferenceType};
use crate::ports::PendingCreditSource;

/// A pending credit rendered as a statement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransientEntry {
    /// Negative, so it can never collide with a stored sequence
    pub index: i64,
    pub source: PendingCreditSource,
    /// Display balance after this credit
    pub balance: Decimal,
}

/// One row of a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum StatementLine {
    Confirmed(LedgerEntry),
    Transient(TransientEntry),
}

impl StatementLine {
    pub fn transaction_date(&self) -> DateTime<Utc> {
        match self {
            StatementLine::Confirmed(entry) => entry.transaction_date,
            StatementLine::Transient(t) => t.source.transaction_date,
        }
    }

    pub fn direction(&self) -> EntryDirection {
        match self {
            StatementLine::Confirmed(entry) => entry.direction,
            StatementLine::Transient(_) => EntryDirection::Credit,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            StatementLine::Confirmed(entry) => entry.amount,
            StatementLine::Transient(t) => t.source.amount,
        }
    }

    pub fn balance(&self) -> Decimal {
        match self {
            StatementLine::Confirmed(entry) => entry.balance,
            StatementLine::Transient(t) => t.balance,
        }
    }

    pub fn reference_type(&self) -> ReferenceType {
        match self {
            StatementLine::Confirmed(entry) => entry.reference_type,
            StatementLine::Transient(_) => ReferenceType::Return,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            StatementLine::Confirmed(entry) => &entry.description,
            StatementLine::Transient(t) => &t.source.description,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StatementLine::Transient(_))
    }

    /// Chronological position: date, then confirmed before transient,
    /// then write order
    fn chronology(&self) -> (DateTime<Utc>, u8, i64) {
        match self {
            StatementLine::Confirmed(entry) => (entry.transaction_date, 0, entry.sequence),
            StatementLine::Transient(t) => (t.source.transaction_date, 1, -t.index),
        }
    }

    /// Newest first
    pub fn display_order(a: &Self, b: &Self) -> Ordering {
        b.chronology().cmp(&a.chronology())
    }
}

/// Merged statement lines and the balances they imply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    /// Newest first
    pub lines: Vec<StatementLine>,
    /// Sum of all pending credits
    pub pending_total: Decimal,
    /// Confirmed balance minus pending credits
    pub display_balance: Decimal,
}

/// Merges confirmed entries with pending credits
pub struct PendingOverlay;

impl PendingOverlay {
    /// `confirmed_balance` is the customer's confirmed current balance, not
    /// the balance of the last entry in `confirmed` (which may be filtered).
    ///
    /// Returns `None` if a pending balance or the pending total overflows.
    pub fn merge(
        confirmed: Vec<LedgerEntry>,
        mut pending: Vec<PendingCreditSource>,
        confirmed_balance: Decimal,
    ) -> Option<OverlayView> {
        pending.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut running = confirmed_balance;
        let mut pending_total = Decimal::ZERO;
        let mut transient = Vec::with_capacity(pending.len());
        for (position, source) in pending.into_iter().enumerate() {
            running = BalanceCalculator::next(running, source.amount, EntryDirection::Credit)?;
            pending_total = pending_total.checked_add(source.amount)?;
            transient.push(StatementLine::Transient(TransientEntry {
                index: -(position as i64 + 1),
                source,
                balance: running,
            }));
        }

        let mut lines: Vec<StatementLine> = confirmed
            .into_iter()
            .map(StatementLine::Confirmed)
            .chain(transient)
            .collect();
        lines.sort_by(StatementLine::display_order);

        Some(OverlayView {
            lines,
            pending_total,
            display_balance: running,
        })
    }
}
