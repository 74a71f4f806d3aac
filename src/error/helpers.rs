use super::{ErrorCode, QualityError};

/// Extension trait for convenient error conversion
pub trait ErrorExt<T> {
    /// Convert to QualityError with context
    fn to_quality(self, context: impl Into<String>) -> Result<T, QualityError>;

    /// Convert to QualityError with specific error type
    fn to_config_error(self, message: impl Into<String>) -> Result<T, QualityError>;
    fn to_storage_error(self, message: impl Into<String>) -> Result<T, QualityError>;
}

impl<T, E> ErrorExt<T> for Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn to_quality(self, context: impl Into<String>) -> Result<T, QualityError> {
        self.map_err(|e| QualityError::other(context).with_source(e))
    }

    fn to_config_error(self, message: impl Into<String>) -> Result<T, QualityError> {
        self.map_err(|e| QualityError::config(message).with_source(e))
    }

    fn to_storage_error(self, message: impl Into<String>) -> Result<T, QualityError> {
        self.map_err(|e| QualityError::storage(message).with_source(e))
    }
}

/// Helper functions for common error scenarios
pub mod common {
    use super::*;

    /// Create a not found error for configuration
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> QualityError {
        QualityError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
    }

    /// Create an error for a metric id missing from the configuration
    pub fn unknown_metric(metric_id: &str) -> QualityError {
        QualityError::config_with_code(
            ErrorCode::CONFIG_UNKNOWN_METRIC,
            format!("Metric '{}' is not configured", metric_id),
        )
    }

    /// Create a validation error for a bad command-line or config value
    pub fn invalid_input(field: &str, message: impl Into<String>) -> QualityError {
        QualityError::validation_with_code(
            ErrorCode::VALIDATION_INVALID_INPUT,
            message,
            Some(field.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_ext_wraps_source() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("disk gone"));
        let err = result.to_storage_error("Failed to write head").unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_GENERIC);
        assert!(err.developer_message().contains("disk gone"));
    }

    #[test]
    fn test_common_errors() {
        assert_eq!(
            common::unknown_metric("m1").code(),
            ErrorCode::CONFIG_UNKNOWN_METRIC
        );
        assert_eq!(
            common::config_not_found("/tmp/quality.yaml").exit_code(),
            2
        );
        assert_eq!(
            common::invalid_input("status", "unknown status").code(),
            ErrorCode::VALIDATION_INVALID_INPUT
        );
    }
}
