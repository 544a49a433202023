//! The batch engine shared by put and delete.
//!
//! Notification cardinality depends on the transaction mode, not on batch size:
//! without a transaction every item is notified as soon as it is written; with
//! one, a single notification covering every touched table follows the commit.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::{AffectsTables, BatchResult, StorageError, StoreExecutor};

/// An open transaction that rolls back unless committed.
///
/// Dropping the scope (early return, `?`, unwinding) ends the transaction
/// without marking it successful.
pub(crate) struct TransactionScope<'a> {
    executor: &'a dyn StoreExecutor,
    ended: bool,
}

impl<'a> TransactionScope<'a> {
    pub(crate) fn begin(executor: &'a dyn StoreExecutor) -> Result<Self, StorageError> {
        executor.begin_transaction()?;
        Ok(Self {
            executor,
            ended: false,
        })
    }

    /// Mark successful and end. If marking fails the transaction is still ended,
    /// which rolls it back, and the marking error is returned.
    pub(crate) fn commit(mut self) -> Result<(), StorageError> {
        self.ended = true;
        let marked = self.executor.mark_transaction_successful();
        let ended = self.executor.end_transaction();
        marked.and(ended)
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        debug!("ending transaction without marking it successful");
        if let Err(e) = self.executor.end_transaction() {
            warn!(error = %e, "failed to end rolled back transaction");
        }
    }
}

/// Run `perform` for every object in input order.
///
/// On any error the open transaction (if any) is rolled back, the error is
/// returned unchanged and no transaction-level notification is sent. Items that
/// were already written without a transaction stay written and notified.
pub(crate) fn execute_batch<T, R, F>(
    executor: &dyn StoreExecutor,
    objects: Vec<Arc<T>>,
    use_transaction_if_possible: bool,
    mut perform: F,
) -> Result<BatchResult<T, R>, StorageError>
where
    R: AffectsTables,
    F: FnMut(&T) -> Result<R, StorageError>,
{
    let with_transaction = use_transaction_if_possible && executor.transactions_supported();
    let transaction = if with_transaction {
        Some(TransactionScope::begin(executor)?)
    } else {
        None
    };

    let mut results = BatchResult::with_capacity(objects.len());

    for (index, object) in objects.into_iter().enumerate() {
        let result = perform(object.as_ref())?;
        trace!(index, "batch item written");

        if transaction.is_none() {
            executor.notify(result.changes());
        }
        results.insert(object, result);
    }

    if let Some(transaction) = transaction {
        transaction.commit()?;

        let changes = results.changes();
        if !changes.is_empty() {
            executor.notify(changes);
        }
    }

    debug!(items = results.len(), with_transaction, "batch completed");
    Ok(results)
}
