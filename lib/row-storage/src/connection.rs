//! Backend connection lifecycle.

use std::path::PathBuf;

use crate::StorageError;

/// Where a backend keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionConfig {
    /// A database file, created if missing.
    Path(PathBuf),
    /// A private database that disappears with the connection.
    InMemory,
}

const IN_MEMORY: &str = ":memory:";

impl From<&str> for ConnectionConfig {
    fn from(path: &str) -> Self {
        if path == IN_MEMORY {
            ConnectionConfig::InMemory
        } else {
            ConnectionConfig::Path(PathBuf::from(path))
        }
    }
}

impl From<String> for ConnectionConfig {
    fn from(path: String) -> Self {
        ConnectionConfig::from(path.as_str())
    }
}

impl From<&String> for ConnectionConfig {
    fn from(path: &String) -> Self {
        ConnectionConfig::from(path.as_str())
    }
}

impl From<PathBuf> for ConnectionConfig {
    fn from(path: PathBuf) -> Self {
        ConnectionConfig::Path(path)
    }
}

/// Connect to a backend and prepare its schema.
pub trait StoreConnection: Sized + Send + Sync {
    fn connect(config: impl Into<ConnectionConfig>) -> Result<Self, StorageError>;

    /// Run schema statements in order. Each statement must be idempotent
    /// (`CREATE TABLE IF NOT EXISTS ...`) since callers run this on every start.
    fn initialize(&self, schema: &[&str]) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_marker_parses_to_in_memory() {
        assert_eq!(ConnectionConfig::from(":memory:"), ConnectionConfig::InMemory);
        assert_eq!(
            ConnectionConfig::from("data/app.db".to_string()),
            ConnectionConfig::Path(PathBuf::from("data/app.db"))
        );
    }
}
