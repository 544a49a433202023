//! Resolvers turn a mapped object into executor calls.
//!
//! One trait per operation kind. Resolvers are shared across operations and
//! threads, so implementations must not keep per-call state.

mod put;

pub use put::{AfterPut, DefaultPutResolver, PutTarget, ROW_ID_COLUMN, Table};

use crate::{
    DeleteQuery, GetQuery, PutResult, QueryExecutor, RowValues, StorageError, StoreExecutor,
};

/// Decides how a row is written and reacts to the outcome.
pub trait PutResolver<T>: Send + Sync {
    fn perform_put(
        &self,
        executor: &dyn StoreExecutor,
        row: &RowValues,
    ) -> Result<PutResult, StorageError>;

    /// Called once per object right after its write, on the same thread.
    ///
    /// Useful for copying a freshly inserted id back into a shared object.
    fn after_put(&self, _object: &T, _result: &PutResult) {}
}

pub trait DeleteResolver: Send + Sync {
    /// Returns the number of rows deleted.
    fn perform_delete(
        &self,
        executor: &dyn StoreExecutor,
        query: &DeleteQuery,
    ) -> Result<u64, StorageError>;
}

pub trait GetResolver<E: QueryExecutor + ?Sized>: Send + Sync {
    fn perform_get(&self, executor: &E, query: &GetQuery) -> Result<E::Rows, StorageError>;
}

/// Deletes exactly what the query says. Field-less, so one value serves everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDeleteResolver;

impl DeleteResolver for DefaultDeleteResolver {
    fn perform_delete(
        &self,
        executor: &dyn StoreExecutor,
        query: &DeleteQuery,
    ) -> Result<u64, StorageError> {
        executor.delete(query)
    }
}

/// Hands the query straight to the executor. Field-less, so one value serves everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGetResolver;

impl<E: QueryExecutor + ?Sized> GetResolver<E> for DefaultGetResolver {
    fn perform_get(&self, executor: &E, query: &GetQuery) -> Result<E::Rows, StorageError> {
        match query {
            GetQuery::Select(select) => executor.query(select),
            GetQuery::Raw(raw) => executor.raw_query(raw),
        }
    }
}
