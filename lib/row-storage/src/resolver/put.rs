//! Default insert-or-update policy.

use tracing::trace;

use super::PutResolver;
use crate::{InsertQuery, PutResult, RowValues, StorageError, StoreExecutor, UpdateQuery, Value};

/// Canonical row-id column of the store.
pub const ROW_ID_COLUMN: &str = "_id";

/// Where the default put policy writes a row.
pub trait PutTarget: Send + Sync {
    fn table(&self, row: &RowValues) -> String;

    /// Column holding the row identifier.
    fn id_column(&self, _row: &RowValues) -> String {
        ROW_ID_COLUMN.to_string()
    }
}

/// A single fixed table, optionally with its own identifier column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    id_column: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_column: ROW_ID_COLUMN.to_string(),
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PutTarget for Table {
    fn table(&self, _row: &RowValues) -> String {
        self.name.clone()
    }

    fn id_column(&self, _row: &RowValues) -> String {
        self.id_column.clone()
    }
}

/// Insert-or-update with insert fallback.
///
/// - no id value (absent or NULL): insert
/// - id value present: update `WHERE <id_column> = ?`
/// - update touched nothing: insert once, the id did not match an existing row
///
/// Holds only its target, never per-call state.
#[derive(Debug, Clone)]
pub struct DefaultPutResolver<P = Table> {
    target: P,
}

impl DefaultPutResolver<Table> {
    pub fn for_table(table: impl Into<String>) -> Self {
        Self::new(Table::new(table))
    }
}

impl<P: PutTarget> DefaultPutResolver<P> {
    pub fn new(target: P) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &P {
        &self.target
    }

    fn insert(
        &self,
        executor: &dyn StoreExecutor,
        row: &RowValues,
        table: String,
    ) -> Result<PutResult, StorageError> {
        let query = InsertQuery::new(table)?;
        let inserted_id = executor.insert(&query, row)?;
        Ok(PutResult::new_insert_result(inserted_id, query.table()))
    }

    fn update_or_insert(
        &self,
        executor: &dyn StoreExecutor,
        row: &RowValues,
        table: String,
        id_column: &str,
        id: &Value,
    ) -> Result<PutResult, StorageError> {
        let query = UpdateQuery::builder()
            .table(&table)
            .where_clause(format!("{} = ?", id_column))
            .where_args([id.clone()])
            .build()?;

        let rows_updated = executor.update(&query, row)?;
        if rows_updated > 0 {
            return Ok(PutResult::new_update_result(rows_updated, table));
        }

        trace!(%table, %id, "no row matched id, inserting instead");
        self.insert(executor, row, table)
    }
}

impl<T, P: PutTarget> PutResolver<T> for DefaultPutResolver<P> {
    fn perform_put(
        &self,
        executor: &dyn StoreExecutor,
        row: &RowValues,
    ) -> Result<PutResult, StorageError> {
        let table = self.target.table(row);
        let id_column = self.target.id_column(row);

        match row.get(&id_column) {
            None | Some(Value::Null) => self.insert(executor, row, table),
            Some(id) => self.update_or_insert(executor, row, table, &id_column, id),
        }
    }
}

/// Adds an `after_put` callback to another put resolver.
pub struct AfterPut<R, F> {
    inner: R,
    callback: F,
}

impl<R, F> AfterPut<R, F> {
    pub fn new(inner: R, callback: F) -> Self {
        Self { inner, callback }
    }
}

impl<T, R, F> PutResolver<T> for AfterPut<R, F>
where
    R: PutResolver<T>,
    F: Fn(&T, &PutResult) + Send + Sync,
{
    fn perform_put(
        &self,
        executor: &dyn StoreExecutor,
        row: &RowValues,
    ) -> Result<PutResult, StorageError> {
        self.inner.perform_put(executor, row)
    }

    fn after_put(&self, object: &T, result: &PutResult) {
        self.inner.after_put(object, result);
        (self.callback)(object, result);
    }
}
