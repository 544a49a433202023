use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use row_storage::{
    ChangeNotifier, Changes, ChangesReceiver, ConnectionConfig, DeleteQuery, InsertQuery,
    ObserveChanges, QueryExecutor, RawQuery, RowValues, SelectQuery, StorageError,
    StoreConnection, StoreExecutor, UpdateQuery, Value,
};
use rusqlite::{Connection, Statement, params_from_iter};
use tracing::{debug, warn};

use crate::bind::{
    build_delete_sql, build_insert_sql, build_select_sql, build_update_sql, from_sql,
    sqlite_error, to_sql,
};

struct Transaction {
    owner: ThreadId,
    marked: bool,
}

struct Inner {
    conn: Connection,
    transaction: Option<Transaction>,
}

/// A single SQLite connection shared behind a mutex.
///
/// An open transaction belongs to the thread that began it. Calls from that
/// thread run inside it; calls from any other thread wait until it ends, so
/// they neither join a transaction that may roll back nor fail on a nested
/// begin.
pub struct SqliteExecutor {
    inner: Mutex<Inner>,
    released: Condvar,
    notifier: ChangeNotifier,
}

fn poisoned<T>(_: PoisonError<T>) -> StorageError {
    StorageError::StorageError("SQLite connection lock poisoned".to_string())
}

fn no_transaction() -> StorageError {
    StorageError::StorageError("No transaction in progress".to_string())
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Mutex::new(Inner {
                conn,
                transaction: None,
            }),
            released: Condvar::new(),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(sqlite_error)?;
        Ok(Self::new(conn))
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(sqlite_error)?;
        Ok(Self::new(conn))
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// True while any thread has a transaction open. Never waits.
    pub fn in_transaction(&self) -> Result<bool, StorageError> {
        Ok(self.inner.lock().map_err(poisoned)?.transaction.is_some())
    }

    /// Lock the connection, first waiting out another thread's transaction.
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        let me = thread::current().id();
        let guard = self.inner.lock().map_err(poisoned)?;
        self.released
            .wait_while(guard, |inner| {
                inner
                    .transaction
                    .as_ref()
                    .is_some_and(|transaction| transaction.owner != me)
            })
            .map_err(poisoned)
    }

    fn execute(&self, sql: &str, args: Vec<rusqlite::types::Value>) -> Result<usize, StorageError> {
        let inner = self.lock()?;
        inner
            .conn
            .execute(sql, params_from_iter(args))
            .map_err(sqlite_error)
    }

    fn fetch(&self, sql: &str, args: &[Value]) -> Result<Vec<RowValues>, StorageError> {
        let inner = self.lock()?;
        let mut stmt = inner.conn.prepare(sql).map_err(sqlite_error)?;
        collect_rows(&mut stmt, args)
    }
}

fn collect_rows(stmt: &mut Statement<'_>, args: &[Value]) -> Result<Vec<RowValues>, StorageError> {
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt
        .query(params_from_iter(args.iter().map(to_sql)))
        .map_err(sqlite_error)?;

    let mut results = Vec::new();
    while let Some(row) = rows.next().map_err(sqlite_error)? {
        let mut values = RowValues::new();
        for (idx, name) in names.iter().enumerate() {
            values.insert(name.as_str(), from_sql(row.get_ref(idx).map_err(sqlite_error)?));
        }
        results.push(values);
    }
    Ok(results)
}

fn finish_transaction(conn: &Connection, marked: bool) -> Result<(), StorageError> {
    if !marked {
        debug!("rolling back transaction");
        return conn.execute_batch("ROLLBACK").map_err(sqlite_error);
    }

    if let Err(e) = conn.execute_batch("COMMIT") {
        // A failed COMMIT can leave the transaction open.
        if !conn.is_autocommit() {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                warn!(error = %rollback, "rollback after failed commit also failed");
            }
        }
        return Err(sqlite_error(e));
    }
    Ok(())
}

impl StoreExecutor for SqliteExecutor {
    fn insert(&self, query: &InsertQuery, row: &RowValues) -> Result<i64, StorageError> {
        let sql = build_insert_sql(query, row);
        let inner = self.lock()?;
        inner
            .conn
            .execute(&sql, params_from_iter(row.values().map(to_sql)))
            .map_err(sqlite_error)?;
        Ok(inner.conn.last_insert_rowid())
    }

    fn update(&self, query: &UpdateQuery, row: &RowValues) -> Result<u64, StorageError> {
        let sql = build_update_sql(query, row)?;
        let args = row
            .values()
            .chain(query.where_args())
            .map(to_sql)
            .collect();
        Ok(self.execute(&sql, args)? as u64)
    }

    fn delete(&self, query: &DeleteQuery) -> Result<u64, StorageError> {
        let sql = build_delete_sql(query);
        let args = query.where_args().iter().map(to_sql).collect();
        Ok(self.execute(&sql, args)? as u64)
    }

    fn exec_sql(&self, query: &RawQuery) -> Result<(), StorageError> {
        let args = query.args().iter().map(to_sql).collect();
        self.execute(query.sql(), args)?;
        Ok(())
    }

    fn transactions_supported(&self) -> bool {
        true
    }

    fn begin_transaction(&self) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        if inner.transaction.is_some() {
            return Err(StorageError::StorageError(
                "Transaction already in progress".to_string(),
            ));
        }
        inner
            .conn
            .execute_batch("BEGIN EXCLUSIVE")
            .map_err(sqlite_error)?;
        inner.transaction = Some(Transaction {
            owner: thread::current().id(),
            marked: false,
        });
        Ok(())
    }

    fn mark_transaction_successful(&self) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let transaction = inner.transaction.as_mut().ok_or_else(no_transaction)?;
        transaction.marked = true;
        Ok(())
    }

    fn end_transaction(&self) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let transaction = inner.transaction.take().ok_or_else(no_transaction)?;

        let ended = finish_transaction(&inner.conn, transaction.marked);
        drop(inner);
        self.released.notify_all();
        ended
    }

    fn notify(&self, changes: Changes) {
        self.notifier.notify(changes);
    }
}

impl QueryExecutor for SqliteExecutor {
    type Rows = Vec<RowValues>;

    fn query(&self, query: &SelectQuery) -> Result<Vec<RowValues>, StorageError> {
        self.fetch(&build_select_sql(query), query.where_args())
    }

    fn raw_query(&self, query: &RawQuery) -> Result<Vec<RowValues>, StorageError> {
        self.fetch(query.sql(), query.args())
    }
}

impl ObserveChanges for SqliteExecutor {
    fn observe_changes_in_tables<I, S>(&self, tables: I) -> ChangesReceiver
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notifier.subscribe(tables)
    }
}

impl StoreConnection for SqliteExecutor {
    fn connect(config: impl Into<ConnectionConfig>) -> Result<Self, StorageError> {
        match config.into() {
            ConnectionConfig::InMemory => Self::open_in_memory(),
            ConnectionConfig::Path(path) => Self::open(path),
        }
    }

    fn initialize(&self, schema: &[&str]) -> Result<(), StorageError> {
        let inner = self.lock()?;
        for statement in schema {
            inner.conn.execute_batch(statement).map_err(sqlite_error)?;
        }
        debug!(statements = schema.len(), "schema initialized");
        Ok(())
    }
}
