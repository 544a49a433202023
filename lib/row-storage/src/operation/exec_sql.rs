use std::sync::Arc;

use tracing::debug;

use super::PreparedOperation;
use crate::{Changes, RawQuery, StorageError, StoreExecutor};

/// Execute one statement that is not a SELECT.
///
/// If the query names the tables it affects, one notification follows.
pub struct PreparedExecSql<E> {
    executor: Arc<E>,
    query: RawQuery,
}

impl<E> PreparedExecSql<E> {
    pub(crate) fn new(executor: Arc<E>, query: RawQuery) -> Self {
        Self { executor, query }
    }
}

impl<E> PreparedOperation for PreparedExecSql<E>
where
    E: StoreExecutor + 'static,
{
    type Output = ();

    fn execute(self) -> Result<(), StorageError> {
        self.executor.exec_sql(&self.query)?;
        debug!(sql = self.query.sql(), "executed sql");

        let affected = self.query.affects_tables();
        if !affected.is_empty() {
            self.executor.notify(Changes::new(affected.iter().cloned()));
        }
        Ok(())
    }
}
