//! Backfill of missing ledger entries
//!
//! Approved business events (returns today, any [`ReconciledEventSource`]
//! tomorrow) are supposed to produce a ledger entry when they are approved.
//! When that write was skipped or failed, the [`Reconciler`] writes the
//! missing entry later. It runs before every statement read and can be swept
//! across all customers on demand.
//!
//! A pass holds the customer's write lock from the first reference-id read to
//! the last append, so two concurrent passes cannot both decide an event is
//! missing. Events are backfilled one by one; a failing event is logged and
//! reported without stopping the rest.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use core_kernel::CustomerId;

use crate::config::LedgerConfig;
use crate::entry::{EntryRequest, LedgerEntry, ReferenceType};
use crate::error::LedgerError;
use crate::ports::{CustomerDirectory, LedgerStore, ReconciledEventSource};
use crate::writer::EntryWriter;

/// An event the reconciler could not bring into the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillFailure {
    pub reference_type: ReferenceType,
    /// `None` when the source itself could not be read
    pub reference_id: Option<Uuid>,
    pub reason: String,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub customer_id: CustomerId,
    /// Entries written by this pass
    pub backfilled: Vec<LedgerEntry>,
    pub failures: Vec<BackfillFailure>,
}

impl ReconciliationReport {
    fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            backfilled: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// No event was left behind
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turns failures into [`LedgerError::ReconciliationPartialFailure`]
    pub fn into_result(self) -> Result<Self, LedgerError> {
        if self.is_clean() {
            return Ok(self);
        }
        Err(LedgerError::ReconciliationPartialFailure {
            customer_id: self.customer_id,
            reference_ids: self.failures.iter().filter_map(|f| f.reference_id).collect(),
        })
    }

    fn fail(&mut self, reference_type: ReferenceType, reference_id: Option<Uuid>, reason: String) {
        self.failures.push(BackfillFailure {
            reference_type,
            reference_id,
            reason,
        });
    }
}

/// Writes ledger entries for approved events that have none
#[derive(Clone)]
pub struct Reconciler {
    writer: EntryWriter,
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerDirectory>,
    sources: Vec<Arc<dyn ReconciledEventSource>>,
    backfill_label: String,
    sweep_concurrency: usize,
}

impl Reconciler {
    pub fn new(
        writer: EntryWriter,
        store: Arc<dyn LedgerStore>,
        customers: Arc<dyn CustomerDirectory>,
        sources: Vec<Arc<dyn ReconciledEventSource>>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            writer,
            store,
            customers,
            sources,
            backfill_label: config.backfill_label.clone(),
            sweep_concurrency: config.sweep_concurrency.max(1),
        }
    }

    /// Runs one pass for the customer
    ///
    /// Never fails as a whole; per-event and per-source problems are listed
    /// in the report. Running it again right after a clean pass writes nothing.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn reconcile(&self, customer_id: CustomerId) -> ReconciliationReport {
        let mut report = ReconciliationReport::new(customer_id);
        let guard = self.writer.lock(customer_id).await;

        for source in &self.sources {
            let reference_type = source.reference_type();

            let events = match source.approved_events(customer_id).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(%reference_type, error = %e, "Could not load approved events");
                    report.fail(reference_type, None, e.to_string());
                    continue;
                }
            };
            if events.is_empty() {
                continue;
            }

            let mut recorded = match self.store.reference_ids(customer_id, reference_type).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(%reference_type, error = %e, "Could not load recorded reference ids");
                    report.fail(reference_type, None, e.to_string());
                    continue;
                }
            };

            for event in events {
                if event.customer_id != customer_id || recorded.contains(&event.id) {
                    continue;
                }

                let request = EntryRequest::new(
                    customer_id,
                    source.direction(),
                    event.amount,
                    reference_type,
                )
                .with_reference(event.id)
                .with_description(format!("{} ({})", event.label, self.backfill_label))
                .dated(event.occurred_at);

                match self.writer.append_locked(&guard, request).await {
                    Ok(entry) => {
                        info!(
                            %reference_type,
                            reference_id = %event.id,
                            balance = %entry.balance,
                            "Backfilled missing ledger entry"
                        );
                        recorded.insert(event.id);
                        report.backfilled.push(entry);
                    }
                    Err(e) => {
                        warn!(
                            %reference_type,
                            reference_id = %event.id,
                            error = %e,
                            "Backfill failed"
                        );
                        report.fail(reference_type, Some(event.id), e.to_string());
                    }
                }
            }
        }

        if !report.backfilled.is_empty() || !report.is_clean() {
            info!(
                backfilled = report.backfilled.len(),
                failed = report.failures.len(),
                "Reconciliation pass finished"
            );
        }
        report
    }

    /// Reconciles every customer in the directory
    ///
    /// Customers run concurrently, bounded by `sweep_concurrency`; reports
    /// come back in completion order.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<Vec<ReconciliationReport>, LedgerError> {
        let customers = self.customers.list_customers().await?;
        info!(customers = customers.len(), "Starting reconciliation sweep");

        let reports = stream::iter(customers)
            .map(|customer| self.reconcile(customer.id))
            .buffer_unordered(self.sweep_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(reports)
    }
}
