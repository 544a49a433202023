use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Task error: {0}")]
    TaskError(String),
}

impl StorageError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        StorageError::ConfigurationError(message.into())
    }

    /// True for errors raised while validating a config or query descriptor,
    /// before any executor call.
    pub fn is_configuration(&self) -> bool {
        matches!(self, StorageError::ConfigurationError(_))
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        StorageError::TaskError(e.to_string())
    }
}
