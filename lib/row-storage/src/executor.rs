//! The backend contract the engine drives.
//!
//! Executors are synchronous: every call blocks until the backend answers.
//! Implementations use interior mutability since the engine only ever holds `&self`.

use crate::{
    Changes, DeleteQuery, InsertQuery, RawQuery, RowValues, SelectQuery, StorageError, UpdateQuery,
};

/// Write side of a row-oriented backend, plus transactions and change notification.
///
/// Put and delete resolvers receive this as `&dyn StoreExecutor`.
pub trait StoreExecutor: Send + Sync {
    /// Insert one row and return the backend's identifier for it.
    fn insert(&self, query: &InsertQuery, row: &RowValues) -> Result<i64, StorageError>;

    /// Update matching rows with `row` and return the number of rows affected.
    fn update(&self, query: &UpdateQuery, row: &RowValues) -> Result<u64, StorageError>;

    /// Delete matching rows and return the number of rows deleted.
    fn delete(&self, query: &DeleteQuery) -> Result<u64, StorageError>;

    /// Execute a statement that is not a SELECT, discarding any result.
    fn exec_sql(&self, query: &RawQuery) -> Result<(), StorageError>;

    fn transactions_supported(&self) -> bool;

    fn begin_transaction(&self) -> Result<(), StorageError>;

    fn mark_transaction_successful(&self) -> Result<(), StorageError>;

    /// End the current transaction: commit if it was marked successful, roll back otherwise.
    fn end_transaction(&self) -> Result<(), StorageError>;

    /// Tell observers that `changes` happened.
    fn notify(&self, changes: Changes);
}

/// Read side of a backend.
///
/// `Rows` is the backend's native result-set handle; the engine returns it untouched.
pub trait QueryExecutor: StoreExecutor {
    type Rows: Send;

    fn query(&self, query: &SelectQuery) -> Result<Self::Rows, StorageError>;

    fn raw_query(&self, query: &RawQuery) -> Result<Self::Rows, StorageError>;
}
