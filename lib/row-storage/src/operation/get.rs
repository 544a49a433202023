use std::sync::Arc;

use super::PreparedOperation;
use crate::{DefaultGetResolver, GetQuery, GetResolver, QueryExecutor, StorageError};

/// Immutable get settings, produced by [`GetConfigBuilder::build`].
pub struct GetConfig<E: QueryExecutor + ?Sized> {
    query: GetQuery,
    resolver: Option<Arc<dyn GetResolver<E>>>,
}

impl<E: QueryExecutor + ?Sized> Clone for GetConfig<E> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl<E: QueryExecutor + ?Sized + 'static> GetConfig<E> {
    pub fn builder() -> GetConfigBuilder<E> {
        GetConfigBuilder {
            query: None,
            resolver: None,
        }
    }

    pub fn query(&self) -> &GetQuery {
        &self.query
    }
}

pub struct GetConfigBuilder<E: QueryExecutor + ?Sized> {
    query: Option<GetQuery>,
    resolver: Option<Arc<dyn GetResolver<E>>>,
}

impl<E: QueryExecutor + ?Sized + 'static> GetConfigBuilder<E> {
    /// Required: a [`crate::SelectQuery`] or a [`crate::RawQuery`].
    pub fn query(mut self, query: impl Into<GetQuery>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Optional, defaults to [`DefaultGetResolver`].
    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: GetResolver<E> + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn build(self) -> Result<GetConfig<E>, StorageError> {
        let query = self
            .query
            .ok_or_else(|| StorageError::configuration("Please specify query"))?;

        Ok(GetConfig {
            query,
            resolver: self.resolver,
        })
    }
}

/// Run a query and hand back the executor's result set untouched.
///
/// No transaction, no notification.
pub struct PreparedGet<E: QueryExecutor> {
    executor: Arc<E>,
    config: GetConfig<E>,
}

impl<E: QueryExecutor> PreparedGet<E> {
    pub(crate) fn new(executor: Arc<E>, config: GetConfig<E>) -> Self {
        Self { executor, config }
    }
}

impl<E> PreparedOperation for PreparedGet<E>
where
    E: QueryExecutor + 'static,
    E::Rows: 'static,
{
    type Output = E::Rows;

    fn execute(self) -> Result<E::Rows, StorageError> {
        let executor = self.executor.as_ref();
        match &self.config.resolver {
            Some(resolver) => resolver.perform_get(executor, &self.config.query),
            None => DefaultGetResolver.perform_get(executor, &self.config.query),
        }
    }
}
