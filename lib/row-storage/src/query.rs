//! Immutable query descriptors consumed by executors and resolvers.
//!
//! Every descriptor is produced by a builder whose `build()` validates it:
//! table names and SQL text are never empty once a descriptor exists.

use std::collections::BTreeSet;

use crate::{StorageError, Value};

fn require_table(table: &str) -> Result<(), StorageError> {
    if table.trim().is_empty() {
        return Err(StorageError::configuration("Table name is null or empty"));
    }
    Ok(())
}

/// A structured SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    distinct: bool,
    columns: Vec<String>,
    where_clause: Option<String>,
    where_args: Vec<Value>,
    group_by: Option<String>,
    having: Option<String>,
    order_by: Option<String>,
    limit: Option<String>,
}

impl SelectQuery {
    pub fn builder() -> SelectQueryBuilder {
        SelectQueryBuilder::default()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn distinct(&self) -> bool {
        self.distinct
    }

    /// Projection; empty means all columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn where_args(&self) -> &[Value] {
        &self.where_args
    }

    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    pub fn having(&self) -> Option<&str> {
        self.having.as_deref()
    }

    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn limit(&self) -> Option<&str> {
        self.limit.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct SelectQueryBuilder {
    table: String,
    distinct: bool,
    columns: Vec<String>,
    where_clause: Option<String>,
    where_args: Vec<Value>,
    group_by: Option<String>,
    having: Option<String>,
    order_by: Option<String>,
    limit: Option<String>,
}

impl SelectQueryBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// WHERE clause with `?` placeholders, without the `WHERE` keyword.
    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    pub fn where_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn having(mut self, having: impl Into<String>) -> Self {
        self.having = Some(having.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// LIMIT expression, e.g. `"10"` or `"10, 20"`.
    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn build(self) -> Result<SelectQuery, StorageError> {
        require_table(&self.table)?;
        Ok(SelectQuery {
            table: self.table,
            distinct: self.distinct,
            columns: self.columns,
            where_clause: self.where_clause,
            where_args: self.where_args,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
            limit: self.limit,
        })
    }
}

/// Target of an INSERT. The values come separately as [`crate::RowValues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertQuery {
    table: String,
}

impl InsertQuery {
    pub fn new(table: impl Into<String>) -> Result<Self, StorageError> {
        let table = table.into();
        require_table(&table)?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Target and filter of an UPDATE. The new values come separately as [`crate::RowValues`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    table: String,
    where_clause: Option<String>,
    where_args: Vec<Value>,
}

impl UpdateQuery {
    pub fn builder() -> UpdateQueryBuilder {
        UpdateQueryBuilder::default()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn where_args(&self) -> &[Value] {
        &self.where_args
    }
}

#[derive(Debug, Default)]
pub struct UpdateQueryBuilder {
    table: String,
    where_clause: Option<String>,
    where_args: Vec<Value>,
}

impl UpdateQueryBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    pub fn where_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<UpdateQuery, StorageError> {
        require_table(&self.table)?;
        Ok(UpdateQuery {
            table: self.table,
            where_clause: self.where_clause,
            where_args: self.where_args,
        })
    }
}

/// A DELETE. Without a WHERE clause every row of the table is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    table: String,
    where_clause: Option<String>,
    where_args: Vec<Value>,
}

impl DeleteQuery {
    pub fn builder() -> DeleteQueryBuilder {
        DeleteQueryBuilder::default()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn where_args(&self) -> &[Value] {
        &self.where_args
    }
}

#[derive(Debug, Default)]
pub struct DeleteQueryBuilder {
    table: String,
    where_clause: Option<String>,
    where_args: Vec<Value>,
}

impl DeleteQueryBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    pub fn where_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<DeleteQuery, StorageError> {
        require_table(&self.table)?;
        Ok(DeleteQuery {
            table: self.table,
            where_clause: self.where_clause,
            where_args: self.where_args,
        })
    }
}

/// Raw SQL with positional arguments.
///
/// `affects_tables` names the tables a non-SELECT statement modifies; exec-SQL
/// notifies about them after the statement runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuery {
    sql: String,
    args: Vec<Value>,
    affects_tables: BTreeSet<String>,
}

impl RawQuery {
    pub fn builder() -> RawQueryBuilder {
        RawQueryBuilder::default()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn affects_tables(&self) -> &BTreeSet<String> {
        &self.affects_tables
    }
}

#[derive(Debug, Default)]
pub struct RawQueryBuilder {
    sql: String,
    args: Vec<Value>,
    affects_tables: BTreeSet<String>,
}

impl RawQueryBuilder {
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn affects_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affects_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<RawQuery, StorageError> {
        if self.sql.trim().is_empty() {
            return Err(StorageError::configuration("Query is null or empty"));
        }
        for table in &self.affects_tables {
            require_table(table)?;
        }
        Ok(RawQuery {
            sql: self.sql,
            args: self.args,
            affects_tables: self.affects_tables,
        })
    }
}

/// The two shapes a get operation can run.
#[derive(Debug, Clone, PartialEq)]
pub enum GetQuery {
    Select(SelectQuery),
    Raw(RawQuery),
}

impl From<SelectQuery> for GetQuery {
    fn from(query: SelectQuery) -> Self {
        GetQuery::Select(query)
    }
}

impl From<RawQuery> for GetQuery {
    fn from(query: RawQuery) -> Self {
        GetQuery::Raw(query)
    }
}
