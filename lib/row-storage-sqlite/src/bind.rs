//! SQL generation from query descriptors and value conversion for rusqlite.

use row_storage::{
    DeleteQuery, InsertQuery, RowValues, SelectQuery, StorageError, UpdateQuery, Value,
};
use rusqlite::types::{Value as SqlValue, ValueRef};

pub(crate) fn sqlite_error(e: rusqlite::Error) -> StorageError {
    StorageError::StorageError(e.to_string())
}

pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int(n) => SqlValue::Integer(*n),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

fn where_suffix(where_clause: Option<&str>) -> String {
    match where_clause {
        Some(clause) if !clause.is_empty() => format!(" WHERE {}", clause),
        _ => String::new(),
    }
}

/// Build INSERT SQL for the row's columns, in row order.
pub(crate) fn build_insert_sql(query: &InsertQuery, row: &RowValues) -> String {
    if row.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", query.table());
    }

    let cols: Vec<&str> = row.columns().collect();
    let placeholders = vec!["?"; cols.len()];
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        query.table(),
        cols.join(", "),
        placeholders.join(", ")
    )
}

/// Build UPDATE SQL. Row values bind first, then the WHERE arguments.
pub(crate) fn build_update_sql(
    query: &UpdateQuery,
    row: &RowValues,
) -> Result<String, StorageError> {
    if row.is_empty() {
        return Err(StorageError::StorageError(format!(
            "No columns to update in {}",
            query.table()
        )));
    }

    let assignments: Vec<String> = row.columns().map(|col| format!("{} = ?", col)).collect();
    Ok(format!(
        "UPDATE {} SET {}{}",
        query.table(),
        assignments.join(", "),
        where_suffix(query.where_clause())
    ))
}

pub(crate) fn build_delete_sql(query: &DeleteQuery) -> String {
    format!(
        "DELETE FROM {}{}",
        query.table(),
        where_suffix(query.where_clause())
    )
}

pub(crate) fn build_select_sql(query: &SelectQuery) -> String {
    let mut sql = String::from("SELECT ");
    if query.distinct() {
        sql.push_str("DISTINCT ");
    }
    if query.columns().is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&query.columns().join(", "));
    }
    sql.push_str(" FROM ");
    sql.push_str(query.table());
    sql.push_str(&where_suffix(query.where_clause()));

    let clauses = [
        (" GROUP BY ", query.group_by()),
        (" HAVING ", query.having()),
        (" ORDER BY ", query.order_by()),
        (" LIMIT ", query.limit()),
    ];
    for (keyword, clause) in clauses {
        if let Some(clause) = clause.filter(|c| !c.is_empty()) {
            sql.push_str(keyword);
            sql.push_str(clause);
        }
    }
    sql
}
