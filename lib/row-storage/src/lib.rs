//! Row Storage - Transactional batch writes over row-oriented stores.
//!
//! Callers describe how each object maps to a row (or to a delete query) and
//! which resolver performs the write. The engine runs single objects or whole
//! collections against a backend executor, optionally inside one transaction,
//! records a per-object outcome and tells observers which tables changed.
//!
//! # Core Concepts
//!
//! - **Executor**: the backend contract ([`StoreExecutor`], [`QueryExecutor`]).
//! - **Resolver**: strategy that turns a mapped row or query into executor calls
//!   ([`PutResolver`], [`DeleteResolver`], [`GetResolver`]).
//! - **Prepared operation**: validated config plus inputs, run once with
//!   [`PreparedOperation::execute`] or [`PreparedOperation::execute_async`].
//! - **Changes**: the set of tables an operation touched, broadcast through
//!   [`ChangeNotifier`].
//!
//! # Batches
//!
//! With a transaction, a batch either commits entirely and sends one
//! notification, or rolls back and sends none. Without one, items apply and
//! notify one by one, and a failure leaves earlier items in place.

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod changes;
mod connection;
mod error;
mod executor;
mod operation;
mod query;
mod resolver;
mod result;
mod row;
mod serde_row;
mod store;

#[cfg(test)]
mod testing;

pub use changes::{ChangeNotifier, Changes, ChangesReceiver, ObserveChanges};
pub use connection::{ConnectionConfig, StoreConnection};
pub use error::StorageError;
pub use executor::{QueryExecutor, StoreExecutor};
pub use operation::{
    DeleteConfig, DeleteConfigBuilder, GetConfig, GetConfigBuilder, MapFunc, PreparedDeleteByQuery,
    PreparedDeleteObject, PreparedDeleteObjects, PreparedExecSql, PreparedGet, PreparedOperation,
    PreparedPutObject, PreparedPutObjects, PutConfig, PutConfigBuilder,
};
pub use query::{
    DeleteQuery, DeleteQueryBuilder, GetQuery, InsertQuery, RawQuery, RawQueryBuilder, SelectQuery,
    SelectQueryBuilder, UpdateQuery, UpdateQueryBuilder,
};
pub use resolver::{
    AfterPut, DefaultDeleteResolver, DefaultGetResolver, DefaultPutResolver, DeleteResolver,
    GetResolver, PutResolver, PutTarget, ROW_ID_COLUMN, Table,
};
pub use result::{
    AffectsTables, BatchResult, DeleteCollectionResult, DeleteResult, PutCollectionResult,
    PutResult,
};
pub use row::{RowValues, Value};
pub use serde_row::{deserialize_row, row_from_serialize};
pub use store::Store;
