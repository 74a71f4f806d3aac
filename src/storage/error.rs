//! Error types for the measurement store

use std::fmt;
use thiserror::Error;

use crate::error::{ErrorCode, QualityError};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The head moved since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout occurred
    #[error("Timeout: operation took longer than {0:?}")]
    Timeout(std::time::Duration),
}

impl StorageError {
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    pub fn lock<E: fmt::Display>(err: E) -> Self {
        Self::Lock(err.to_string())
    }

    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn conflict<E: fmt::Display>(msg: E) -> Self {
        Self::Conflict(msg.to_string())
    }

    pub fn configuration<E: fmt::Display>(msg: E) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Lock(_) | Self::Timeout(_))
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

/// Convert StorageError to QualityError
impl From<StorageError> for QualityError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::Io(_) => ErrorCode::STORAGE_IO_ERROR,
            StorageError::Serialization(_) => ErrorCode::STORAGE_SERIALIZATION_ERROR,
            StorageError::Lock(_) => ErrorCode::STORAGE_LOCK_FAILED,
            StorageError::NotFound(_) => ErrorCode::STORAGE_NOT_FOUND,
            StorageError::Conflict(_) => ErrorCode::STORAGE_CONFLICT,
            StorageError::Configuration(_) => ErrorCode::STORAGE_BACKEND_ERROR,
            StorageError::Timeout(_) => ErrorCode::STORAGE_TEMPORARY,
        };

        QualityError::storage_with_code(code, err.to_string(), None).with_source(err)
    }
}
