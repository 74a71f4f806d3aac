use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;
pub mod helpers;

pub use codes::{describe_error_code, ErrorCode};
pub use helpers::{common, ErrorExt};

/// The unified error type of the quality collector
#[derive(Error, Debug)]
pub enum QualityError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Collection error: {message}")]
    Collection {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Measurement log error: {message}")]
    Log {
        code: u16,
        message: String,
        metric_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl QualityError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with default code
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            code: ErrorCode::STORAGE_GENERIC,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    pub fn collection_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Collection {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a measurement log error for a metric
    pub fn log_with_code(code: u16, message: impl Into<String>, metric_id: Option<String>) -> Self {
        Self::Log {
            code,
            message: message.into(),
            metric_id,
            source: None,
        }
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Collection { source: src, .. }
            | Self::Log { source: src, .. }
            | Self::Validation { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Storage { message, .. }
            | Self::Collection { message, .. }
            | Self::Log { message, .. }
            | Self::Validation { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Storage { .. } => 4,
            Self::Collection { .. } => 5,
            Self::Log { .. } => 6,
            Self::Validation { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Storage { code, .. }
            | Self::Collection { code, .. }
            | Self::Log { code, .. }
            | Self::Validation { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Storage { message, path, .. } => {
                if let Some(p) = path {
                    format!("Storage error at {}: {}", p.display(), message)
                } else {
                    format!("Storage error: {}", message)
                }
            }
            Self::Collection { message, .. } => format!("Collection failed: {}", message),
            Self::Log {
                message, metric_id, ..
            } => {
                if let Some(id) = metric_id {
                    format!("Measurements of metric '{}': {}", id, message)
                } else {
                    format!("Measurement log error: {}", message)
                }
            }
            Self::Validation { message, field, .. } => {
                if let Some(f) = field {
                    format!("Validation error for '{}': {}", f, message)
                } else {
                    format!("Validation error: {}", message)
                }
            }
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        message
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage { code, .. } => {
                *code == ErrorCode::STORAGE_TEMPORARY || *code == ErrorCode::STORAGE_LOCK_BUSY
            }
            Self::Log { code, .. } => *code == ErrorCode::LOG_CONTENTION,
            _ => false,
        }
    }
}

/// Type alias for Results using QualityError
pub type Result<T> = std::result::Result<T, QualityError>;

/// Type alias for library Results (same as Result for now)
pub type LibResult<T> = std::result::Result<T, QualityError>;

/// Type alias for application Results (using anyhow for flexibility)
pub type AppResult<T> = anyhow::Result<T>;

// Conversion from common error types

impl From<std::io::Error> for QualityError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::InvalidData => (ErrorCode::STORAGE_CORRUPTED, "Invalid data"),
            ErrorKind::WouldBlock => (
                ErrorCode::STORAGE_LOCK_BUSY,
                "Resource temporarily unavailable",
            ),
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        QualityError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<serde_yaml::Error> for QualityError {
    fn from(err: serde_yaml::Error) -> Self {
        QualityError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

impl From<serde_json::Error> for QualityError {
    fn from(err: serde_json::Error) -> Self {
        QualityError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, "Invalid JSON syntax")
            .with_source(err)
    }
}

impl From<crate::collector::CollectError> for QualityError {
    fn from(err: crate::collector::CollectError) -> Self {
        QualityError::collection_with_code(ErrorCode::COLLECT_GENERIC, err.to_string())
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "head.json");
        let err = QualityError::storage("Cannot read measurement")
            .with_source(io_err)
            .with_context("while loading history");

        assert_eq!(err.code(), ErrorCode::STORAGE_GENERIC);
        assert!(err.to_string().contains("[E3000]"));
        assert!(err.user_message().contains("Cannot read measurement"));
        assert!(err.developer_message().contains("head.json"));
    }

    #[test]
    fn test_error_codes() {
        let err = QualityError::config_with_code(ErrorCode::CONFIG_NOT_FOUND, "Config not found");
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_recoverable_errors() {
        let busy = QualityError::storage_with_code(ErrorCode::STORAGE_LOCK_BUSY, "busy", None);
        assert!(busy.is_recoverable());

        let contention =
            QualityError::log_with_code(ErrorCode::LOG_CONTENTION, "gave up", Some("m".into()));
        assert!(contention.is_recoverable());
        assert!(contention.user_message().contains("'m'"));

        assert!(!QualityError::config("bad").is_recoverable());
    }
}
