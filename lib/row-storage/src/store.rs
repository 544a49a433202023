//! Entry point that hands out prepared operations bound to one executor.

use std::sync::Arc;

use crate::{
    ChangesReceiver, DeleteConfig, DeleteQuery, GetConfig, ObserveChanges, PreparedDeleteByQuery,
    PreparedDeleteObject, PreparedDeleteObjects, PreparedExecSql, PreparedGet, PreparedPutObject,
    PreparedPutObjects, PutConfig, QueryExecutor, RawQuery, RowValues, StoreExecutor,
};

/// Shares one executor between every operation it prepares.
///
/// Preparing does no I/O; nothing touches the executor until the returned
/// operation is executed.
#[derive(Debug)]
pub struct Store<E> {
    executor: Arc<E>,
}

impl<E> Clone for Store<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: StoreExecutor> Store<E> {
    pub fn new(executor: E) -> Self {
        Self::from_arc(Arc::new(executor))
    }

    pub fn from_arc(executor: Arc<E>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    pub fn put_object<T>(
        &self,
        object: impl Into<Arc<T>>,
        config: PutConfig<T>,
    ) -> PreparedPutObject<E, T> {
        PreparedPutObject::new(Arc::clone(&self.executor), object.into(), config)
    }

    /// Objects are tracked by allocation: pass the same `Arc` twice and it gets one result.
    pub fn put_objects<T, I>(&self, objects: I, config: PutConfig<T>) -> PreparedPutObjects<E, T>
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        let objects = objects.into_iter().map(Into::into).collect();
        PreparedPutObjects::new(Arc::clone(&self.executor), objects, config)
    }

    pub fn put_row(
        &self,
        row: RowValues,
        config: PutConfig<RowValues>,
    ) -> PreparedPutObject<E, RowValues> {
        self.put_object(row, config)
    }

    pub fn put_rows<I>(
        &self,
        rows: I,
        config: PutConfig<RowValues>,
    ) -> PreparedPutObjects<E, RowValues>
    where
        I: IntoIterator<Item = RowValues>,
    {
        self.put_objects(rows, config)
    }

    pub fn delete_object<T>(
        &self,
        object: impl Into<Arc<T>>,
        config: DeleteConfig<T>,
    ) -> PreparedDeleteObject<E, T> {
        PreparedDeleteObject::new(Arc::clone(&self.executor), object.into(), config)
    }

    pub fn delete_objects<T, I>(
        &self,
        objects: I,
        config: DeleteConfig<T>,
    ) -> PreparedDeleteObjects<E, T>
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        let objects = objects.into_iter().map(Into::into).collect();
        PreparedDeleteObjects::new(Arc::clone(&self.executor), objects, config)
    }

    pub fn delete_by_query(&self, query: DeleteQuery) -> PreparedDeleteByQuery<E> {
        PreparedDeleteByQuery::new(Arc::clone(&self.executor), query)
    }

    pub fn exec_sql(&self, query: RawQuery) -> PreparedExecSql<E> {
        PreparedExecSql::new(Arc::clone(&self.executor), query)
    }
}

impl<E: QueryExecutor> Store<E> {
    pub fn get(&self, config: GetConfig<E>) -> PreparedGet<E> {
        PreparedGet::new(Arc::clone(&self.executor), config)
    }
}

impl<E: StoreExecutor + ObserveChanges> ObserveChanges for Store<E> {
    fn observe_changes_in_tables<I, S>(&self, tables: I) -> ChangesReceiver
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.executor.observe_changes_in_tables(tables)
    }
}
