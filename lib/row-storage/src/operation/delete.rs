use std::sync::Arc;

use tracing::debug;

use super::batch::execute_batch;
use super::{MapFunc, PreparedOperation};
use crate::{
    AffectsTables, DefaultDeleteResolver, DeleteCollectionResult, DeleteQuery, DeleteResolver,
    DeleteResult, StorageError, StoreExecutor,
};

fn resolve(resolver: &Option<Arc<dyn DeleteResolver>>) -> &dyn DeleteResolver {
    match resolver {
        Some(resolver) => resolver.as_ref(),
        None => &DefaultDeleteResolver,
    }
}

fn delete_by(
    executor: &dyn StoreExecutor,
    resolver: &dyn DeleteResolver,
    query: &DeleteQuery,
) -> Result<DeleteResult, StorageError> {
    let rows_deleted = resolver.perform_delete(executor, query)?;
    Ok(DeleteResult::new(rows_deleted, [query.table()]))
}

/// Immutable delete settings, produced by [`DeleteConfigBuilder::build`].
pub struct DeleteConfig<T> {
    map_func: MapFunc<T, DeleteQuery>,
    resolver: Option<Arc<dyn DeleteResolver>>,
    use_transaction_if_possible: bool,
}

impl<T> Clone for DeleteConfig<T> {
    fn clone(&self) -> Self {
        Self {
            map_func: Arc::clone(&self.map_func),
            resolver: self.resolver.clone(),
            use_transaction_if_possible: self.use_transaction_if_possible,
        }
    }
}

impl<T: 'static> DeleteConfig<T> {
    pub fn builder() -> DeleteConfigBuilder<T> {
        DeleteConfigBuilder::default()
    }

    pub fn use_transaction_if_possible(&self) -> bool {
        self.use_transaction_if_possible
    }

    fn delete_one(
        &self,
        executor: &dyn StoreExecutor,
        object: &T,
    ) -> Result<DeleteResult, StorageError> {
        let query = (self.map_func)(object)?;
        delete_by(executor, resolve(&self.resolver), &query)
    }
}

pub struct DeleteConfigBuilder<T> {
    map_func: Option<MapFunc<T, DeleteQuery>>,
    resolver: Option<Arc<dyn DeleteResolver>>,
    use_transaction_if_possible: bool,
}

impl<T> Default for DeleteConfigBuilder<T> {
    fn default() -> Self {
        Self {
            map_func: None,
            resolver: None,
            use_transaction_if_possible: true,
        }
    }
}

impl<T: 'static> DeleteConfigBuilder<T> {
    /// Required: which rows each object stands for.
    pub fn map_func<F>(mut self, map_func: F) -> Self
    where
        F: Fn(&T) -> Result<DeleteQuery, StorageError> + Send + Sync + 'static,
    {
        self.map_func = Some(Arc::new(map_func));
        self
    }

    /// Optional, defaults to [`DefaultDeleteResolver`].
    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: DeleteResolver + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn use_transaction_if_possible(mut self) -> Self {
        self.use_transaction_if_possible = true;
        self
    }

    pub fn dont_use_transaction(mut self) -> Self {
        self.use_transaction_if_possible = false;
        self
    }

    pub fn build(self) -> Result<DeleteConfig<T>, StorageError> {
        let map_func = self
            .map_func
            .ok_or_else(|| StorageError::configuration("Please specify map function"))?;

        Ok(DeleteConfig {
            map_func,
            resolver: self.resolver,
            use_transaction_if_possible: self.use_transaction_if_possible,
        })
    }
}

/// Delete the rows one object maps to.
pub struct PreparedDeleteObject<E, T> {
    executor: Arc<E>,
    object: Arc<T>,
    config: DeleteConfig<T>,
}

impl<E, T> PreparedDeleteObject<E, T> {
    pub(crate) fn new(executor: Arc<E>, object: Arc<T>, config: DeleteConfig<T>) -> Self {
        Self {
            executor,
            object,
            config,
        }
    }
}

impl<E, T> PreparedOperation for PreparedDeleteObject<E, T>
where
    E: StoreExecutor + 'static,
    T: Send + Sync + 'static,
{
    type Output = DeleteResult;

    fn execute(self) -> Result<DeleteResult, StorageError> {
        let executor: &dyn StoreExecutor = self.executor.as_ref();
        let result = self.config.delete_one(executor, &self.object)?;

        debug!(rows = result.rows_deleted(), "object(s) deleted");
        executor.notify(result.changes());
        Ok(result)
    }
}

/// Delete a collection of objects through the batch engine.
pub struct PreparedDeleteObjects<E, T> {
    executor: Arc<E>,
    objects: Vec<Arc<T>>,
    config: DeleteConfig<T>,
}

impl<E, T> PreparedDeleteObjects<E, T> {
    pub(crate) fn new(executor: Arc<E>, objects: Vec<Arc<T>>, config: DeleteConfig<T>) -> Self {
        Self {
            executor,
            objects,
            config,
        }
    }
}

impl<E, T> PreparedOperation for PreparedDeleteObjects<E, T>
where
    E: StoreExecutor + 'static,
    T: Send + Sync + 'static,
{
    type Output = DeleteCollectionResult<T>;

    fn execute(self) -> Result<DeleteCollectionResult<T>, StorageError> {
        let executor: &dyn StoreExecutor = self.executor.as_ref();
        let config = &self.config;

        execute_batch(
            executor,
            self.objects,
            config.use_transaction_if_possible,
            |object| config.delete_one(executor, object),
        )
    }
}

/// Delete whatever a caller-built query matches.
pub struct PreparedDeleteByQuery<E> {
    executor: Arc<E>,
    query: DeleteQuery,
    resolver: Option<Arc<dyn DeleteResolver>>,
}

impl<E> PreparedDeleteByQuery<E> {
    pub(crate) fn new(executor: Arc<E>, query: DeleteQuery) -> Self {
        Self {
            executor,
            query,
            resolver: None,
        }
    }

    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: DeleteResolver + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }
}

impl<E> PreparedOperation for PreparedDeleteByQuery<E>
where
    E: StoreExecutor + 'static,
{
    type Output = DeleteResult;

    fn execute(self) -> Result<DeleteResult, StorageError> {
        let executor: &dyn StoreExecutor = self.executor.as_ref();
        let result = delete_by(executor, resolve(&self.resolver), &self.query)?;

        debug!(
            table = self.query.table(),
            rows = result.rows_deleted(),
            "deleted by query"
        );
        executor.notify(result.changes());
        Ok(result)
    }
}
