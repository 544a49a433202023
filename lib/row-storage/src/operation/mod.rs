//! Prepared operations: validated config plus inputs, ready to run.

mod batch;
mod delete;
mod exec_sql;
mod get;
mod put;

pub use delete::{
    DeleteConfig, DeleteConfigBuilder, PreparedDeleteByQuery, PreparedDeleteObject,
    PreparedDeleteObjects,
};
pub use exec_sql::PreparedExecSql;
pub use get::{GetConfig, GetConfigBuilder, PreparedGet};
pub use put::{PreparedPutObject, PreparedPutObjects, PutConfig, PutConfigBuilder};

use std::sync::Arc;

use async_trait::async_trait;

use crate::StorageError;

/// Maps a caller's object to what the resolver consumes (a row or a delete query).
pub type MapFunc<T, R> = Arc<dyn Fn(&T) -> Result<R, StorageError> + Send + Sync>;

/// An operation that has everything it needs and runs exactly once.
#[async_trait]
pub trait PreparedOperation: Sized + Send + 'static {
    type Output: Send + 'static;

    /// Run on the calling thread, blocking until the executor is done.
    fn execute(self) -> Result<Self::Output, StorageError>;

    /// Run [`PreparedOperation::execute`] on tokio's blocking pool.
    ///
    /// Nothing happens until the future is first polled. Once started, the
    /// operation runs to completion even if the future is dropped: dropping only
    /// discards the result. Must be awaited inside a tokio runtime.
    async fn execute_async(self) -> Result<Self::Output, StorageError> {
        tokio::task::spawn_blocking(move || self.execute()).await?
    }
}
