//! Insert-or-update reconciliation of scrape outcomes
//!
//! The reconciler holds the store lock for the whole find-then-write
//! sequence, so two scrapes of the same URL can never both take the insert
//! branch. The store's UNIQUE constraint on `url` stays as the backstop.

use crate::storage::traits::{ScrapeStore, StorageError, StorageResult};
use crate::storage::{ScrapeRecord, SharedStore, StoredRecord};
use std::sync::MutexGuard;

/// Locks a shared store, mapping poisoning to a storage error
pub fn lock_store(
    store: &SharedStore,
) -> StorageResult<MutexGuard<'_, dyn ScrapeStore + Send + 'static>> {
    store.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Persists scrape outcomes with at most one record per URL
#[derive(Clone)]
pub struct Reconciler {
    store: SharedStore,
}

impl Reconciler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The store this reconciler writes to
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Inserts the record, or overwrites the existing record for its URL
    ///
    /// Persistence failures are returned to the caller as-is; they are never
    /// retried here.
    pub fn reconcile(&self, record: &ScrapeRecord) -> StorageResult<StoredRecord> {
        let mut store = lock_store(&self.store)?;

        match store.find_by_url(&record.url)? {
            Some(existing) => {
                let updated = store.update_record(existing.id, record)?;
                tracing::info!("Updated existing record for: {}", record.url);
                Ok(updated)
            }
            None => {
                let inserted = store.insert_record(record)?;
                tracing::info!("Saved new record for: {}", record.url);
                Ok(inserted)
            }
        }
    }
}
