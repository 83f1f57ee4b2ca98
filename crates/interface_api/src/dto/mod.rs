//! Request and response bodies
//!
//! Statements, summaries, reports and entries are serialized straight from
//! the domain types; only request shapes and small wrappers live here.

pub mod ledger;

pub use ledger::*;
