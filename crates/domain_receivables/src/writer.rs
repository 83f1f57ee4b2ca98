//! Entry writer
//!
//! The only component allowed to create ledger entries. Writes for one
//! customer are serialized by a per-customer async lock, so the
//! read-last-balance / compute / append sequence never interleaves with
//! another writer in this process. Writes for different customers never
//! wait on each other.
//!
//! The store's sequence check is the second line: if another process got
//! the next sequence first, the store answers `PortError::Conflict` and the
//! writer re-reads the chain and tries again, up to
//! [`LedgerConfig::max_append_attempts`] times.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use core_kernel::{CustomerId, LedgerEntryId};

use crate::balance::BalanceCalculator;
use crate::config::LedgerConfig;
use crate::entry::{EntryRequest, LedgerEntry};
use crate::error::LedgerError;
use crate::ports::{CustomerDirectory, LedgerStore};

/// Registry of per-customer write locks
///
/// A customer's lock lives only while some task holds or waits for it; the
/// last guard to drop removes it, so the map stays bounded by the customers
/// currently being written.
#[derive(Debug, Clone, Default)]
pub struct CustomerLocks {
    locks: Arc<DashMap<CustomerId, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive write access to the customer's ledger
    pub async fn acquire(&self, customer_id: CustomerId) -> CustomerGuard {
        // Clone the Arc out so the map shard is not held across the await
        let lock = self
            .locks
            .entry(customer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        CustomerGuard {
            customer_id,
            locks: self.locks.clone(),
            permit: Some(lock.lock_owned().await),
        }
    }

    /// Customers with a live lock
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive write access to one customer's ledger, released on drop
#[derive(Debug)]
pub struct CustomerGuard {
    customer_id: CustomerId,
    locks: Arc<DashMap<CustomerId, Arc<Mutex<()>>>>,
    permit: Option<OwnedMutexGuard<()>>,
}

impl CustomerGuard {
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }
}

impl Drop for CustomerGuard {
    fn drop(&mut self) {
        // Release first so only the map's own reference can remain
        drop(self.permit.take());
        // Waiters clone the Arc under the shard lock, so a count of one
        // means nobody holds or waits for this lock
        self.locks
            .remove_if(&self.customer_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Appends entries with correct sequence and running balance
#[derive(Clone)]
pub struct EntryWriter {
    store: Arc<dyn LedgerStore>,
    customers: Arc<dyn CustomerDirectory>,
    locks: CustomerLocks,
    max_attempts: u32,
}

impl EntryWriter {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        customers: Arc<dyn CustomerDirectory>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            store,
            customers,
            locks: CustomerLocks::new(),
            max_attempts: config.max_append_attempts.max(1),
        }
    }

    /// Takes the customer's write lock
    ///
    /// Hold the guard to make several writes (and the reads deciding them)
    /// atomic with respect to other writers, then write with
    /// [`append_locked`](Self::append_locked).
    pub async fn lock(&self, customer_id: CustomerId) -> CustomerGuard {
        self.locks.acquire(customer_id).await
    }

    /// Appends one entry
    ///
    /// Rejects non-positive amounts before touching the store and unknown
    /// customers before taking the lock.
    #[instrument(skip(self, request), fields(
        customer_id = %request.customer_id,
        direction = %request.direction,
        amount = %request.amount,
        reference_type = %request.reference_type,
    ))]
    pub async fn append(&self, request: EntryRequest) -> Result<LedgerEntry, LedgerError> {
        self.validate(&request).await?;
        let guard = self.lock(request.customer_id).await;
        self.write(&guard, request).await
    }

    /// Appends one entry unless the ledger already holds its reference id
    ///
    /// Returns `None` when an entry with the same reference type and id
    /// exists. Requests without a reference id are always written.
    #[instrument(skip(self, request), fields(
        customer_id = %request.customer_id,
        reference_type = %request.reference_type,
    ))]
    pub async fn append_unique(
        &self,
        request: EntryRequest,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        self.validate(&request).await?;
        let guard = self.lock(request.customer_id).await;
        self.write_unique(&guard, request).await
    }

    /// Appends one entry under a lock the caller already holds
    pub async fn append_locked(
        &self,
        guard: &CustomerGuard,
        request: EntryRequest,
    ) -> Result<LedgerEntry, LedgerError> {
        Self::check_guard(guard, &request)?;
        self.validate(&request).await?;
        self.write(guard, request).await
    }

    fn check_guard(guard: &CustomerGuard, request: &EntryRequest) -> Result<(), LedgerError> {
        if guard.customer_id() != request.customer_id {
            return Err(LedgerError::WrongCustomerGuard {
                held: guard.customer_id(),
                requested: request.customer_id,
            });
        }
        Ok(())
    }

    async fn validate(&self, request: &EntryRequest) -> Result<(), LedgerError> {
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(request.amount));
        }
        if !self.customers.exists(request.customer_id).await? {
            return Err(LedgerError::CustomerNotFound(request.customer_id));
        }
        Ok(())
    }

    async fn write_unique(
        &self,
        guard: &CustomerGuard,
        request: EntryRequest,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        if let Some(reference_id) = request.reference_id {
            let existing = self
                .store
                .reference_ids(request.customer_id, request.reference_type)
                .await?;
            if existing.contains(&reference_id) {
                debug!(%reference_id, "Entry already recorded, skipping");
                return Ok(None);
            }
        }
        self.write(guard, request).await.map(Some)
    }

    async fn write(
        &self,
        _guard: &CustomerGuard,
        request: EntryRequest,
    ) -> Result<LedgerEntry, LedgerError> {
        let customer_id = request.customer_id;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let previous = self.store.last_entry(customer_id).await?;
            let (previous_balance, sequence) = previous
                .map_or((Decimal::ZERO, 1), |last| (last.balance, last.sequence + 1));

            let Some(balance) =
                BalanceCalculator::next(previous_balance, request.amount, request.direction)
            else {
                warn!(%previous_balance, "Entry would overflow the running balance");
                return Err(LedgerError::BalanceOverflow(customer_id));
            };

            let now = Utc::now();
            let entry = LedgerEntry {
                id: LedgerEntryId::new_v7(),
                customer_id,
                sequence,
                direction: request.direction,
                amount: request.amount,
                balance,
                reference_type: request.reference_type,
                reference_id: request.reference_id,
                description: request.description.clone(),
                transaction_date: request.transaction_date.unwrap_or(now),
                created_at: now,
            };

            match self.store.append(entry).await {
                Ok(stored) => {
                    info!(
                        entry_id = %stored.id,
                        sequence = stored.sequence,
                        balance = %stored.balance,
                        "Ledger entry appended"
                    );
                    return Ok(stored);
                }
                Err(e) if e.is_conflict() && attempt < self.max_attempts => {
                    warn!(attempt, sequence, "Sequence taken by another writer, retrying");
                }
                Err(e) if e.is_conflict() => {
                    warn!(attempts = attempt, "Giving up after repeated sequence conflicts");
                    return Err(LedgerError::ConcurrencyConflict {
                        customer_id,
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
