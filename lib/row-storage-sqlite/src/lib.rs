//! SQLite implementation for row-storage.
//!
//! [`SqliteExecutor`] drives one `rusqlite` connection: it generates SQL from
//! the query descriptors, maps transactions onto `BEGIN EXCLUSIVE` /
//! `COMMIT` / `ROLLBACK`, and broadcasts change notifications to observers.
//!
//! ```text
//! use row_storage::{PreparedOperation, PutConfig, Store, StoreConnection};
//! use row_storage_sqlite::SqliteExecutor;
//!
//! let executor = SqliteExecutor::connect(":memory:")?;
//! executor.initialize(&[
//!     "CREATE TABLE IF NOT EXISTS users (_id INTEGER PRIMARY KEY, name TEXT)",
//! ])?;
//!
//! let store = Store::new(executor);
//! let config = PutConfig::rows().table("users").build()?;
//! store.put_rows(rows, config).execute()?;
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod bind;
mod executor;

pub use executor::SqliteExecutor;
