use std::sync::Arc;

use tracing::debug;

use super::batch::execute_batch;
use super::{MapFunc, PreparedOperation};
use crate::{
    AffectsTables, DefaultPutResolver, PutCollectionResult, PutResolver, PutResult, RowValues,
    StorageError, StoreExecutor,
};

/// Immutable put settings, produced by [`PutConfigBuilder::build`].
pub struct PutConfig<T> {
    map_func: MapFunc<T, RowValues>,
    resolver: Arc<dyn PutResolver<T>>,
    use_transaction_if_possible: bool,
}

impl<T> Clone for PutConfig<T> {
    fn clone(&self) -> Self {
        Self {
            map_func: Arc::clone(&self.map_func),
            resolver: Arc::clone(&self.resolver),
            use_transaction_if_possible: self.use_transaction_if_possible,
        }
    }
}

impl<T: 'static> PutConfig<T> {
    pub fn builder() -> PutConfigBuilder<T> {
        PutConfigBuilder::default()
    }

    pub fn use_transaction_if_possible(&self) -> bool {
        self.use_transaction_if_possible
    }

    pub fn resolver(&self) -> &dyn PutResolver<T> {
        self.resolver.as_ref()
    }

    fn put_one(
        &self,
        executor: &dyn StoreExecutor,
        object: &T,
    ) -> Result<PutResult, StorageError> {
        let row = (self.map_func)(object)?;
        let result = self.resolver.perform_put(executor, &row)?;
        self.resolver.after_put(object, &result);
        Ok(result)
    }
}

impl PutConfig<RowValues> {
    /// Builder for putting rows as-is.
    pub fn rows() -> PutConfigBuilder<RowValues> {
        PutConfigBuilder::default().map_func(|row: &RowValues| Ok(row.clone()))
    }
}

pub struct PutConfigBuilder<T> {
    map_func: Option<MapFunc<T, RowValues>>,
    resolver: Option<Arc<dyn PutResolver<T>>>,
    use_transaction_if_possible: bool,
}

impl<T> Default for PutConfigBuilder<T> {
    fn default() -> Self {
        Self {
            map_func: None,
            resolver: None,
            use_transaction_if_possible: true,
        }
    }
}

impl<T: 'static> PutConfigBuilder<T> {
    /// Required: how each object becomes a row.
    pub fn map_func<F>(mut self, map_func: F) -> Self
    where
        F: Fn(&T) -> Result<RowValues, StorageError> + Send + Sync + 'static,
    {
        self.map_func = Some(Arc::new(map_func));
        self
    }

    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: PutResolver<T> + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn shared_resolver(mut self, resolver: Arc<dyn PutResolver<T>>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use [`DefaultPutResolver`] writing into `table`.
    pub fn table(self, table: impl Into<String>) -> Self {
        self.resolver(DefaultPutResolver::for_table(table))
    }

    /// Wrap batches in a transaction when the executor supports one. The default.
    pub fn use_transaction_if_possible(mut self) -> Self {
        self.use_transaction_if_possible = true;
        self
    }

    pub fn dont_use_transaction(mut self) -> Self {
        self.use_transaction_if_possible = false;
        self
    }

    pub fn build(self) -> Result<PutConfig<T>, StorageError> {
        let map_func = self
            .map_func
            .ok_or_else(|| StorageError::configuration("Please specify map function"))?;
        let resolver = self
            .resolver
            .ok_or_else(|| StorageError::configuration("Please specify put resolver or table"))?;

        Ok(PutConfig {
            map_func,
            resolver,
            use_transaction_if_possible: self.use_transaction_if_possible,
        })
    }
}

/// Put one object: one resolver call, one notification, no transaction.
pub struct PreparedPutObject<E, T> {
    executor: Arc<E>,
    object: Arc<T>,
    config: PutConfig<T>,
}

impl<E, T> PreparedPutObject<E, T> {
    pub(crate) fn new(executor: Arc<E>, object: Arc<T>, config: PutConfig<T>) -> Self {
        Self {
            executor,
            object,
            config,
        }
    }
}

impl<E, T> PreparedOperation for PreparedPutObject<E, T>
where
    E: StoreExecutor + 'static,
    T: Send + Sync + 'static,
{
    type Output = PutResult;

    fn execute(self) -> Result<PutResult, StorageError> {
        let executor: &dyn StoreExecutor = self.executor.as_ref();
        let result = self.config.put_one(executor, &self.object)?;

        debug!(
            table = result.affected_table(),
            inserted = result.was_inserted(),
            "put object"
        );
        executor.notify(result.changes());
        Ok(result)
    }
}

/// Put a collection of objects through the batch engine.
pub struct PreparedPutObjects<E, T> {
    executor: Arc<E>,
    objects: Vec<Arc<T>>,
    config: PutConfig<T>,
}

impl<E, T> PreparedPutObjects<E, T> {
    pub(crate) fn new(executor: Arc<E>, objects: Vec<Arc<T>>, config: PutConfig<T>) -> Self {
        Self {
            executor,
            objects,
            config,
        }
    }
}

impl<E, T> PreparedOperation for PreparedPutObjects<E, T>
where
    E: StoreExecutor + 'static,
    T: Send + Sync + 'static,
{
    type Output = PutCollectionResult<T>;

    fn execute(self) -> Result<PutCollectionResult<T>, StorageError> {
        let executor: &dyn StoreExecutor = self.executor.as_ref();
        let config = &self.config;

        execute_batch(
            executor,
            self.objects,
            config.use_transaction_if_possible,
            |object| config.put_one(executor, object),
        )
    }
}
