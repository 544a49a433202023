//! Recording executor for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use crate::{
    Changes, DeleteQuery, InsertQuery, QueryExecutor, RawQuery, RowValues, SelectQuery,
    StorageError, StoreExecutor, UpdateQuery, Value,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Insert {
        table: String,
    },
    Update {
        table: String,
        where_clause: Option<String>,
        where_args: Vec<Value>,
    },
    Delete {
        table: String,
    },
    ExecSql {
        sql: String,
    },
    Query {
        table: String,
    },
    RawQuery {
        sql: String,
    },
    Begin,
    MarkSuccessful,
    End,
    Notify(Changes),
}

/// Records every call in order.
///
/// Updates match a row when their first WHERE argument is one of the existing ids.
/// Deletes report one row for every query whose first argument is not `"missing"`.
pub(crate) struct RecordingExecutor {
    calls: Mutex<Vec<Call>>,
    transactions: bool,
    existing_ids: HashSet<i64>,
    next_id: AtomicI64,
    inserts: AtomicUsize,
    fail_insert_at: Option<usize>,
}

impl RecordingExecutor {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            transactions: true,
            existing_ids: HashSet::new(),
            next_id: AtomicI64::new(1),
            inserts: AtomicUsize::new(0),
            fail_insert_at: None,
        }
    }

    pub(crate) fn without_transactions(mut self) -> Self {
        self.transactions = false;
        self
    }

    pub(crate) fn with_existing_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.existing_ids.extend(ids);
        self
    }

    /// Make the `n`-th insert (1-based) fail.
    pub(crate) fn failing_insert_at(mut self, n: usize) -> Self {
        self.fail_insert_at = Some(n);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn notifications(&self) -> Vec<Changes> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Notify(changes) => Some(changes),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub(crate) fn insert_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Insert { .. }))
    }

    pub(crate) fn update_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Update { .. }))
    }

    pub(crate) fn delete_count(&self) -> usize {
        self.count(|call| matches!(call, Call::Delete { .. }))
    }
}

impl StoreExecutor for RecordingExecutor {
    fn insert(&self, query: &InsertQuery, _row: &RowValues) -> Result<i64, StorageError> {
        self.record(Call::Insert {
            table: query.table().to_string(),
        });
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_insert_at == Some(n) {
            return Err(StorageError::StorageError(format!("insert #{} failed", n)));
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn update(&self, query: &UpdateQuery, _row: &RowValues) -> Result<u64, StorageError> {
        self.record(Call::Update {
            table: query.table().to_string(),
            where_clause: query.where_clause().map(str::to_string),
            where_args: query.where_args().to_vec(),
        });
        let matched = query
            .where_args()
            .first()
            .and_then(Value::as_int)
            .is_some_and(|id| self.existing_ids.contains(&id));
        Ok(u64::from(matched))
    }

    fn delete(&self, query: &DeleteQuery) -> Result<u64, StorageError> {
        self.record(Call::Delete {
            table: query.table().to_string(),
        });
        let missing = query.where_args().first() == Some(&Value::from("missing"));
        Ok(u64::from(!missing))
    }

    fn exec_sql(&self, query: &RawQuery) -> Result<(), StorageError> {
        self.record(Call::ExecSql {
            sql: query.sql().to_string(),
        });
        Ok(())
    }

    fn transactions_supported(&self) -> bool {
        self.transactions
    }

    fn begin_transaction(&self) -> Result<(), StorageError> {
        self.record(Call::Begin);
        Ok(())
    }

    fn mark_transaction_successful(&self) -> Result<(), StorageError> {
        self.record(Call::MarkSuccessful);
        Ok(())
    }

    fn end_transaction(&self) -> Result<(), StorageError> {
        self.record(Call::End);
        Ok(())
    }

    fn notify(&self, changes: Changes) {
        self.record(Call::Notify(changes));
    }
}

impl QueryExecutor for RecordingExecutor {
    type Rows = Vec<String>;

    fn query(&self, query: &SelectQuery) -> Result<Self::Rows, StorageError> {
        self.record(Call::Query {
            table: query.table().to_string(),
        });
        Ok(vec![query.table().to_string()])
    }

    fn raw_query(&self, query: &RawQuery) -> Result<Self::Rows, StorageError> {
        self.record(Call::RawQuery {
            sql: query.sql().to_string(),
        });
        Ok(vec![query.sql().to_string()])
    }
}
